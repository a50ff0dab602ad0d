//! Virtual port naming policy.

/// When the virtual ports are created and what they are called.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PortNaming {
    /// Create generically named ports at startup, before any connection.
    Immediate,
    /// Create generically named ports on the first successful connect.
    Generic,
    /// Create ports on the first successful connect, named after the console.
    #[default]
    DeviceName,
}

impl PortNaming {
    /// Map the operator flags. `no_wait` implies `no_name`.
    pub fn from_flags(no_wait: bool, no_name: bool) -> Self {
        match (no_wait, no_name) {
            (true, _) => PortNaming::Immediate,
            (false, true) => PortNaming::Generic,
            (false, false) => PortNaming::DeviceName,
        }
    }

    pub fn creates_at_startup(self) -> bool {
        self == PortNaming::Immediate
    }

    /// Port name for this policy, or `None` when the console's name is
    /// required but not yet known.
    pub fn port_name(self, base: &str, device_name: Option<String>) -> Option<String> {
        match self {
            PortNaming::Immediate | PortNaming::Generic => Some(base.to_string()),
            PortNaming::DeviceName => device_name.map(|device| format!("{} '{}'", base, device)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::BASE_PORT_NAME;

    #[test]
    fn test_from_flags() {
        assert_eq!(PortNaming::from_flags(true, false), PortNaming::Immediate);
        assert_eq!(PortNaming::from_flags(true, true), PortNaming::Immediate);
        assert_eq!(PortNaming::from_flags(false, true), PortNaming::Generic);
        assert_eq!(PortNaming::from_flags(false, false), PortNaming::DeviceName);
    }

    #[test]
    fn test_generic_names_ignore_device() {
        for naming in [PortNaming::Immediate, PortNaming::Generic] {
            assert_eq!(
                naming.port_name(BASE_PORT_NAME, Some("Desk1".to_string())),
                Some("Allen & Heath Desk".to_string())
            );
        }
    }

    #[test]
    fn test_device_name_format() {
        assert_eq!(
            PortNaming::DeviceName.port_name(BASE_PORT_NAME, Some("Desk1".to_string())),
            Some("Allen & Heath Desk 'Desk1'".to_string())
        );
    }

    #[test]
    fn test_device_name_required() {
        assert_eq!(PortNaming::DeviceName.port_name(BASE_PORT_NAME, None), None);
    }

    #[test]
    fn test_only_immediate_creates_at_startup() {
        assert!(PortNaming::Immediate.creates_at_startup());
        assert!(!PortNaming::Generic.creates_at_startup());
        assert!(!PortNaming::DeviceName.creates_at_startup());
    }
}
