mod file;
mod pair;
mod provider;

pub use file::FileTokenProvider;
pub use pair::TokenPair;
pub(crate) use pair::RefreshedTokens;
pub use provider::{MemoryTokenProvider, TokenProvider};
