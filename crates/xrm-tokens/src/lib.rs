pub mod data;
pub mod interpreter;
pub mod parser;
pub mod types;

pub use data::{
    ColumnSet, DataAccess, DataError, EntityMetadata, MetadataCache, OrderBy, RelatedQuery,
};
pub use interpreter::{
    Engine, EngineOptions, LintWarning, TemplateError, compute_suggestions, lint_template,
};
pub use parser::{ParseError, parse_template};
pub use types::{Record, Reference, Value};

/// Creates a `HashMap<String, Value>` from key-value pairs.
///
/// Values are converted via `Into<Value>`, so you can pass integers,
/// strings, booleans, decimals, or [`Reference`] values directly.
///
/// # Example
///
/// ```
/// use xrm_tokens::{Value, attrs};
///
/// let a = attrs! { "name" => "Acme", "numberofemployees" => 250 };
/// assert_eq!(a.len(), 2);
/// assert_eq!(a["name"], Value::String("Acme".into()));
/// ```
#[macro_export]
macro_rules! attrs {
    {} => {
        ::std::collections::HashMap::<String, $crate::Value>::new()
    };
    { $($key:expr => $value:expr),+ $(,)? } => {
        {
            let mut map = ::std::collections::HashMap::<String, $crate::Value>::new();
            $(
                map.insert($key.to_string(), ::std::convert::Into::<$crate::Value>::into($value));
            )+
            map
        }
    };
}
