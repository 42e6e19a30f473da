mod matcher;

pub use matcher::{FaqCategory, FaqEntry, FaqMatcher, FaqQuestion, FUZZY_MATCH_THRESHOLD};
