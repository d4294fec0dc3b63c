use crate::Error;
use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;

/// A 48-bit hardware address.
///
/// Parses from the usual colon- or dash-delimited hex notation. Parsing is
/// the client-side validation step: a malformed string never reaches the
/// backend.
#[repr(transparent)]
#[derive(Default, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    fn write_delimited(&self, sep: &str) -> String {
        format!(
            "{:02X}{sep}{:02X}{sep}{:02X}{sep}{:02X}{sep}{:02X}{sep}{:02X}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl Display for MacAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.write_delimited(":"))
    }
}

impl Debug for MacAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.write_delimited(":"))
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(arr: [u8; 6]) -> Self {
        Self(arr)
    }
}

impl FromStr for MacAddr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || Error::Validation(format!("malformed MAC address: {s:?}"));

        let hex_str = if s.contains(':') || s.contains('-') {
            let sep = if s.contains(':') { ':' } else { '-' };
            let groups: Vec<&str> = s.split(sep).collect();
            if groups.len() != 6 || groups.iter().any(|g| g.len() != 2) {
                return Err(malformed());
            }
            groups.concat()
        } else {
            s.to_string()
        };

        if hex_str.len() != 12 {
            return Err(malformed());
        }

        let bytes = hex::decode(&hex_str).map_err(|_| malformed())?;
        Ok(Self(bytes.try_into().map_err(|_| malformed())?))
    }
}

#[cfg(test)]
mod test {
    use crate::{Error, MacAddr};

    #[test]
    fn test_format() {
        let mac = MacAddr::from([0x11, 0x22, 0x03, 0x00, 0x50, 0x6A]);
        assert_eq!(mac.to_string(), "11:22:03:00:50:6A")
    }

    #[test]
    fn test_parse() {
        let mac = MacAddr::from([0x11, 0x22, 0x03, 0x00, 0x50, 0x6A]);
        assert_eq!(mac, "11:22:03:00:50:6A".parse().unwrap());
        assert_eq!(mac, "11-22-03-00-50-6A".parse().unwrap());
        assert_eq!(mac, "11220300506a".parse().unwrap());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "",
            "11:22:33:44:55",
            "11:22:33:44:55:66:77",
            "11:22:33:44:55:zz",
            "1:22:33:44:55:666",
            "11-22-33:44-55-66",
            "not a mac",
        ] {
            assert!(
                matches!(bad.parse::<MacAddr>(), Err(Error::Validation(_))),
                "accepted {bad:?}"
            );
        }
    }
}
