//! Library surface for the parlor client: re-exports the session
//! machine from `parlor-net` so other programs can embed a parlor
//! client without going through the CLI binary.

pub use parlor_net::client::{Client, SetKeysOutcome, State};
pub use parlor_net::{ClientError, ClientId};
pub use parlor_net::store::StoreError;
