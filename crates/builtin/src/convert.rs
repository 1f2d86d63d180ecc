//! The `archi.convert.string_to_number` interface.
//!
//! Parses a string into a number at init time; the result is read through
//! the `value` slot. Unparsable input fails the initialization, which in a
//! replay means the whole step fails and is undone.

use archi_app::ContextInterface;
use archi_core::{ArchiError, ArchiResult, ArrayLayout, ParamList, SlotKey, Value};

use crate::util::string_of;

/// The `archi.convert.string_to_number` interface.
pub struct StringToNumberInterface;

const PARAM_STRING: &str = "string";
const PARAM_TYPE: &str = "type";
const SLOT_VALUE: &str = "value";
const SLOT_STRING: &str = "string";

struct ConvertedNumber {
    source: String,
    value: Value,
}

impl ContextInterface for StringToNumberInterface {
    fn name(&self) -> &'static str {
        "archi.convert.string_to_number"
    }

    fn init(&self, params: &ParamList) -> ArchiResult<Value> {
        let mut source: Option<String> = None;
        let mut target = "i64".to_owned();

        for (name, value) in params.iter_first_wins() {
            match name {
                PARAM_STRING => {
                    source = Some(string_of(value).ok_or_else(|| {
                        ArchiError::value(PARAM_STRING, "expected a string value")
                    })?);
                }
                PARAM_TYPE => {
                    target = string_of(value).ok_or_else(|| {
                        ArchiError::value(PARAM_TYPE, "expected a string value")
                    })?;
                }
                other => return Err(ArchiError::key(other)),
            }
        }

        let source =
            source.ok_or_else(|| ArchiError::value(PARAM_STRING, "parameter is required"))?;
        let text = source.trim();

        let value = match target.as_str() {
            "i64" => {
                let number: i64 = text.parse().map_err(|_| {
                    ArchiError::value(PARAM_STRING, "not a valid integer")
                })?;
                Value::data_of(number, ArrayLayout::of_type::<i64>(1))
            }
            "f64" => {
                let number: f64 = text.parse().map_err(|_| {
                    ArchiError::value(PARAM_STRING, "not a valid floating-point number")
                })?;
                Value::data_of(number, ArrayLayout::of_type::<f64>(1))
            }
            _ => {
                return Err(ArchiError::value(
                    PARAM_TYPE,
                    "supported types are `i64` and `f64`",
                ))
            }
        };

        Ok(Value::data_of(
            ConvertedNumber { source, value },
            ArrayLayout::of_type::<ConvertedNumber>(1),
        ))
    }

    fn get(&self, handle: &Value, slot: &SlotKey) -> ArchiResult<Value> {
        let converted = handle
            .borrow_as::<ConvertedNumber>()
            .ok_or_else(|| ArchiError::misuse("converter handle is gone"))?;
        match slot.name.as_str() {
            SLOT_VALUE => Ok(converted.value.clone()),
            SLOT_STRING => Ok(Value::data_of(
                converted.source.clone(),
                ArrayLayout::of_count(1),
            )),
            _ => Err(ArchiError::key(slot.name.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convert(text: &str, target: Option<&str>) -> ArchiResult<Value> {
        let mut params = ParamList::new().with(
            "string",
            Value::data_of(text.to_owned(), ArrayLayout::of_count(1)),
        );
        if let Some(target) = target {
            params.push(
                "type",
                Value::data_of(target.to_owned(), ArrayLayout::of_count(1)),
            );
        }
        StringToNumberInterface.init(&params)
    }

    #[test]
    fn parses_integers_by_default() {
        let handle = convert(" -17 ", None).unwrap();
        let value = StringToNumberInterface
            .get(&handle, &SlotKey::named("value"))
            .unwrap();
        assert_eq!(*value.borrow_as::<i64>().unwrap(), -17);
    }

    #[test]
    fn parses_floats_on_request() {
        let handle = convert("2.75", Some("f64")).unwrap();
        let value = StringToNumberInterface
            .get(&handle, &SlotKey::named("value"))
            .unwrap();
        assert_eq!(*value.borrow_as::<f64>().unwrap(), 2.75);
    }

    #[test]
    fn keeps_the_source_string() {
        let handle = convert("42", None).unwrap();
        let source = StringToNumberInterface
            .get(&handle, &SlotKey::named("string"))
            .unwrap();
        assert_eq!(*source.borrow_as::<String>().unwrap(), "42");
    }

    #[test]
    fn unparsable_input_fails_init() {
        assert!(matches!(
            convert("four", None),
            Err(ArchiError::Value { .. })
        ));
        assert!(matches!(
            convert("1.5", None), // an integer was requested
            Err(ArchiError::Value { .. })
        ));
        assert!(matches!(
            convert("1", Some("u128")),
            Err(ArchiError::Value { .. })
        ));
    }

    #[test]
    fn missing_string_parameter() {
        assert!(StringToNumberInterface.init(&ParamList::new()).is_err());
    }
}
