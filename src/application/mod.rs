// ============================================================
// Layer 2: Application / Use Cases
// ============================================================
// Workflow coordination only: each use case wires the data,
// ml and infra layers together for one command.
//
// Rules for this layer:
//   - No tensor code here
//   - No printing here (that's Layer 1)
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Training run: load, split, standardize, train, report
pub mod train_use_case;

// Scoring the best checkpoint of a finished run
pub mod evaluate_use_case;
