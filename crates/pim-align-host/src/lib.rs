//! Host load balancer: turns a caller's sets (or a single set, or a single
//! pair) into tile batches, dispatches them, and reassembles the flat
//! result vector the CLI prints from.

pub mod all_mode;
pub mod balancer;
pub mod cost;
pub mod reassembly;
pub mod triangular;

pub use all_mode::ComparisonMetadata;
pub use balancer::{bucket_sets, dispatch_pair_mode, dispatch_set_mode, set_pair_offsets, total_output_len, SetBalancer};
pub use cost::{sorted_by_load_desc, SetLoad};
pub use reassembly::reassemble;
pub use triangular::{total_pairs, triangular_index};
