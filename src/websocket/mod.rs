pub mod broadcaster;
pub mod handler;
pub mod msg_flip_handler;
