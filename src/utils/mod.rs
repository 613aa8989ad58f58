pub mod constants;
mod interact;
mod wait_for_element;

pub use interact::{click_element, click_selector, type_into};
pub use wait_for_element::wait_for_element;
