mod model;
mod password;
mod store;

pub use model::{Account, NewAccount};
pub use password::{hash_password, verify_password};
pub use store::{AccountStore, PgAccountStore, StoreError};
