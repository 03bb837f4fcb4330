//! Script model for do-nothing scripts.
//!
//! Scripts are TOML (or YAML) files with a `hacenada` preamble and an ordered
//! list of steps. Each step is a question or instruction shown to the operator.

mod parser;
mod schema;

pub use parser::{
    autolabel, load_script, normalize, parse_script_str, parse_script_yaml_str, to_toml_string,
};
pub use schema::{Script, Step, StepType, StructuredScript};
