pub mod clock;
pub mod console;
pub mod dispatcher;
pub mod export;
pub mod history;
pub mod interpreter;
pub mod render;

pub use console::Console;
pub use dispatcher::Dispatcher;
pub use export::{export_csv, export_filename};
pub use history::History;
pub use interpreter::{Interpreter, NEXT_STEP_PROMPT, NO_PROVIDER_REPLY};
pub use render::logs_to_xml;
