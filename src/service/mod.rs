pub mod alternatives;
pub mod codes;
pub mod decision;
pub mod duplicates;
pub mod engine;
pub mod filter;
pub mod ledger;
pub mod normalizer;
pub mod review;
pub mod similarity;

pub use alternatives::{add_alternative_description, merge_alternative};
pub use codes::{CodeGenerator, RandomCodeGenerator, SequentialCodeGenerator};
pub use decision::decide;
pub use duplicates::{duplicate_groups, find_duplicate_groups, set_duplicate_ignored};
pub use engine::MatchingEngine;
pub use filter::{classify_line, is_valid_product_line, LineVerdict, NonProductKind};
pub use ledger::{add_price_entry, recompute_derived_prices};
pub use normalizer::normalize_description;
pub use similarity::{find_similar_products, matching_method, rank_candidates};
