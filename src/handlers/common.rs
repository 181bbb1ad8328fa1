use serde::{de::Error as _, Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum LaxInt {
    Int(i64),
    Float(f64),
    Text(String),
}

fn out_of_range<E: serde::de::Error>(value: impl std::fmt::Display) -> E {
    E::custom(format!("{value} is out of range"))
}

/// Deserializes an `i32` from a JSON integer, an integral float or a numeric
/// string. Booleans, fractions and out-of-range values are rejected.
pub fn lax_i32<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    match LaxInt::deserialize(deserializer)? {
        LaxInt::Int(v) => i32::try_from(v).map_err(|_| out_of_range(v)),
        LaxInt::Float(v) if v.is_finite() && v.fract() == 0.0 => {
            if v >= i32::MIN as f64 && v <= i32::MAX as f64 {
                Ok(v as i32)
            } else {
                Err(out_of_range(v))
            }
        }
        LaxInt::Float(v) => Err(D::Error::custom(format!("{v} is not a whole number"))),
        LaxInt::Text(s) => s
            .trim()
            .parse::<i32>()
            .map_err(|_| D::Error::custom(format!("\"{s}\" is not a valid integer"))),
    }
}
