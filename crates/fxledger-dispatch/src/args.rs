//! Invocation argument decoding and parsing.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use fxledger_types::{Amount, ArgEncoding, LedgerError, LockDirection, Order, Result};

/// Decode the function name and arguments as one unit.
///
/// With [`ArgEncoding::Base64`] every value must be standard base64 of a
/// UTF-8 string; if any value is not, every value is returned unmodified.
pub fn decode_invocation(
    encoding: ArgEncoding,
    function: &str,
    args: &[String],
) -> (String, Vec<String>) {
    match encoding {
        ArgEncoding::Plain => (function.to_string(), args.to_vec()),
        ArgEncoding::Base64 => {
            let decoded = std::iter::once(function)
                .chain(args.iter().map(String::as_str))
                .map(decode_one)
                .collect::<Option<Vec<String>>>();
            match decoded {
                Some(mut values) => {
                    let rest = values.split_off(1);
                    let function = values.pop().unwrap_or_default();
                    (function, rest)
                }
                None => {
                    tracing::debug!(
                        function = %function,
                        "arguments are not base64, using them as given"
                    );
                    (function.to_string(), args.to_vec())
                }
            }
        }
    }
}

fn decode_one(value: &str) -> Option<String> {
    let bytes = STANDARD.decode(value).ok()?;
    String::from_utf8(bytes).ok()
}

/// Positional arguments of one call, checked for arity up front.
#[derive(Debug)]
pub struct Args<'a> {
    function: &'a str,
    values: &'a [String],
}

impl<'a> Args<'a> {
    /// Require exactly `names.len()` arguments.
    ///
    /// # Errors
    /// [`LedgerError::InvalidArguments`] naming the expected arguments.
    pub fn exact(function: &'a str, values: &'a [String], names: &[&str]) -> Result<Self> {
        if values.len() != names.len() {
            return Err(LedgerError::InvalidArguments {
                reason: format!(
                    "{function} expects {} argument(s) [{}], got {}",
                    names.len(),
                    names.join(", "),
                    values.len()
                ),
            });
        }
        Ok(Self { function, values })
    }

    /// The argument at `idx` as a string.
    pub fn str(&self, idx: usize) -> &'a str {
        self.values.get(idx).map_or("", String::as_str)
    }

    /// The argument at `idx` as an amount.
    pub fn amount(&self, idx: usize) -> Result<Amount> {
        let raw = self.str(idx);
        raw.trim()
            .parse::<Amount>()
            .map_err(|e| self.invalid(idx, &format!("{raw:?} is not an amount: {e}")))
    }

    /// The argument at `idx` as a lock direction (`lock` / `unlock`).
    pub fn direction(&self, idx: usize) -> Result<LockDirection> {
        let raw = self.str(idx);
        LockDirection::from_key_part(raw)
            .ok_or_else(|| self.invalid(idx, &format!("{raw:?} is neither lock nor unlock")))
    }

    /// The argument at `idx` as a JSON order.
    pub fn order(&self, idx: usize) -> Result<Order> {
        serde_json::from_str(self.str(idx))
            .map_err(|e| self.invalid(idx, &format!("malformed order: {e}")))
    }

    fn invalid(&self, idx: usize, reason: &str) -> LedgerError {
        LedgerError::InvalidArguments {
            reason: format!("{} argument {idx}: {reason}", self.function),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn b64(s: &str) -> String {
        STANDARD.encode(s)
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn base64_decodes_everything() {
        let (function, args) = decode_invocation(
            ArgEncoding::Base64,
            &b64("lockBalance"),
            &[b64("alice"), b64("USD"), b64("o1"), b64("40")],
        );
        assert_eq!(function, "lockBalance");
        assert_eq!(args, strings(&["alice", "USD", "o1", "40"]));
    }

    #[rstest]
    #[case::plain_function("lockBalance", vec![b64("alice")])]
    #[case::plain_argument(&b64("lockBalance"), vec![b64("alice"), "not base64!".to_string()])]
    #[case::non_utf8(&b64("lockBalance"), vec![STANDARD.encode([0xff, 0xfe])])]
    fn any_undecodable_value_passes_everything_through(
        #[case] function: &str,
        #[case] args: Vec<String>,
    ) {
        let (out_function, out_args) = decode_invocation(ArgEncoding::Base64, function, &args);
        assert_eq!(out_function, function);
        assert_eq!(out_args, args);
    }

    #[test]
    fn plain_encoding_is_untouched() {
        let args = vec![b64("alice")];
        let (function, out) = decode_invocation(ArgEncoding::Plain, &b64("f"), &args);
        assert_eq!(function, b64("f"));
        assert_eq!(out, args);
    }

    #[test]
    fn arity_is_checked() {
        let values = strings(&["a"]);
        let err = Args::exact("getBalance", &values, &["owner", "currency"]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("getBalance"), "{msg}");
        assert!(msg.contains("owner, currency"), "{msg}");
    }

    #[rstest]
    #[case::plain("40", Some(40))]
    #[case::padded(" 7 ", Some(7))]
    #[case::negative("-3", Some(-3))]
    #[case::text("forty", None)]
    #[case::fraction("1.5", None)]
    fn amount_parsing(#[case] raw: &str, #[case] expected: Option<Amount>) {
        let values = strings(&[raw]);
        let args = Args::exact("f", &values, &["amount"]).unwrap();
        assert_eq!(args.amount(0).ok(), expected);
    }

    #[rstest]
    #[case::lock("lock", Some(LockDirection::Lock))]
    #[case::unlock("UNLOCK", Some(LockDirection::Unlock))]
    #[case::bool_true("true", Some(LockDirection::Lock))]
    #[case::junk("maybe", None)]
    fn direction_parsing(#[case] raw: &str, #[case] expected: Option<LockDirection>) {
        let values = strings(&[raw]);
        let args = Args::exact("f", &values, &["direction"]).unwrap();
        assert_eq!(args.direction(0).ok(), expected);
    }

    #[test]
    fn order_parsing() {
        let order = Order::dummy_fill("alice", "X", "Y", 40, 5);
        let values = vec![serde_json::to_string(&order).unwrap(), "{".to_string()];
        let args = Args::exact("settle", &values, &["buy", "sell"]).unwrap();
        assert_eq!(args.order(0).unwrap(), order);
        assert!(matches!(
            args.order(1),
            Err(LedgerError::InvalidArguments { .. })
        ));
    }
}
