pub mod decode;
pub mod receiver;

pub use receiver::MessageReceiver;
