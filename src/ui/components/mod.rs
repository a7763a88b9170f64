mod command_input;
mod footer;
mod form_modal;
mod input;
mod key_result;
mod search_input;
mod toasts;

pub use command_input::{CommandEvent, CommandInput};
pub use footer::draw_footer;
pub use form_modal::{draw_form, handle_form_key, FormEvent};
pub use key_result::KeyResult;
pub use search_input::{SearchEvent, SearchInput};
pub use toasts::draw_toasts;
