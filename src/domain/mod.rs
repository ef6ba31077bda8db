pub mod user;
pub mod competition;
pub mod cart;
pub mod payment;
pub mod registration;

pub use user::*;
pub use competition::*;
pub use cart::*;
pub use payment::*;
pub use registration::*;
