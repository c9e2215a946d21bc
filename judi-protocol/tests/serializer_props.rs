//! Output shape properties over generated value sequences

use heapless::String;
use judi_protocol::{serialize, Fragment, LiveField, Value};
use proptest::prelude::*;

const SPLICE: &[Value<'static>] = &[Value::Key("spliced"), Value::U32(7), Value::End];

struct Absent;

impl LiveField for Absent {
    fn fetch(&self) -> Option<Fragment<'_>> {
        None
    }
}

struct Present;

impl LiveField for Present {
    fn fetch(&self) -> Option<Fragment<'_>> {
        Fragment::from_slice(&[Value::Key("live"), Value::Null, Value::End]).ok()
    }
}

static ABSENT: Absent = Absent;
static PRESENT: Present = Present;

/// Turn op codes into an object, optionally preceded by an unmatched close
fn build(ops: &[u8], number: u16, stray_close: bool) -> std::vec::Vec<Value<'static>> {
    let mut values = std::vec::Vec::new();
    if stray_close {
        values.push(Value::Close);
    }
    values.push(Value::Open);
    let mut depth = 1;
    for op in ops {
        match op {
            0 => {
                values.push(Value::Key("obj"));
                values.push(Value::Open);
                depth += 1;
            }
            1 => {
                values.push(Value::Key("s"));
                values.push(Value::Str("text"));
            }
            2 => {
                values.push(Value::Key("n"));
                values.push(Value::U16(number));
            }
            3 if depth > 1 => {
                values.push(Value::Close);
                depth -= 1;
            }
            3 => {
                values.push(Value::Key("z"));
                values.push(Value::Null);
            }
            4 => values.push(Value::List(SPLICE)),
            5 => values.push(Value::Live(&ABSENT)),
            _ => values.push(Value::Live(&PRESENT)),
        }
    }
    values.push(Value::End);
    values
}

fn render(values: &[Value<'_>]) -> String<4096> {
    let mut out = String::new();
    serialize(&mut out, values);
    out
}

proptest! {
    #[test]
    fn test_braces_balance(
        ops in prop::collection::vec(0u8..7, 0..48),
        number in any::<u16>(),
        stray_close in any::<bool>()
    ) {
        let out = render(&build(&ops, number, stray_close));
        let opens = out.matches('{').count();
        let closes = out.matches('}').count();
        prop_assert_eq!(opens, closes);
        prop_assert!(out.starts_with('{'), "output does not start with an open brace: {}", out);
        prop_assert!(out.ends_with('}'), "output does not end with a close brace: {}", out);
    }

    #[test]
    fn test_no_stray_commas(ops in prop::collection::vec(0u8..7, 0..48), number in any::<u16>()) {
        let out = render(&build(&ops, number, false));
        prop_assert!(!out.contains(",,"), "double comma in {}", out);
        prop_assert!(!out.contains(",}"), "trailing comma in {}", out);
        prop_assert!(!out.contains("{,"), "leading comma in {}", out);
        prop_assert!(!out.contains(":,"), "missing value in {}", out);
    }
}
