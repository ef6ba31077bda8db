pub mod payhere;

pub use payhere::{
    format_amount, parse_amount, CheckoutForm, GatewayStatus, PayHereClient, PayHereNotification,
};
