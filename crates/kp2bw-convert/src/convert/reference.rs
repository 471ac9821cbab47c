// ── kp2bw-convert / reference ──────────────────────────────────────────────────
//
// KeePass field references: {REF:<field>@<mode>:<target>}

use super::error::ConvertError;

/// Field a reference points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferencedField {
    /// `U`
    Username,
    /// `P`
    Password,
    /// Any other KeePass field code (`T`, `A`, `N`, `I`, `O`).
    Other(String),
}

impl ReferencedField {
    fn from_code(code: &str) -> Self {
        match code {
            "U" => Self::Username,
            "P" => Self::Password,
            other => Self::Other(other.to_string()),
        }
    }
}

/// How the target is looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupMode {
    /// `I`: by entry identifier.
    Identifier,
    Other(String),
}

impl LookupMode {
    fn from_code(code: &str) -> Self {
        match code {
            "I" => Self::Identifier,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceToken {
    pub field: ReferencedField,
    pub mode: LookupMode,
    pub target: String,
}

/// Parse a field reference such as `{REF:U@I:CFC0141068E83547BCEEAF0C1ADABAE0}`.
///
/// The string splits on `:` into exactly three parts; the last part minus its
/// closing character is the target and the middle part is `<field>@<mode>`.
pub fn parse_token(raw: &str) -> Result<ReferenceToken, ConvertError> {
    let tokens: Vec<&str> = raw.split(':').collect();
    if tokens.len() != 3 {
        return Err(ConvertError::reference_format(format!(
            "Invalid REF string '{}': expected 3 ':'-separated parts, found {}",
            raw,
            tokens.len()
        )));
    }

    let selector: Vec<&str> = tokens[1].split('@').collect();
    if selector.len() != 2 {
        return Err(ConvertError::reference_format(format!(
            "Invalid REF string '{}': expected <field>@<mode>, found '{}'",
            raw, tokens[1]
        )));
    }

    let mut target = tokens[2].to_string();
    target.pop();

    Ok(ReferenceToken {
        field: ReferencedField::from_code(selector[0]),
        mode: LookupMode::from_code(selector[1]),
        target,
    })
}
