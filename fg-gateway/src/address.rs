use command_abi::{UNITS_PATH, UnitResource};
use url::Url;

use crate::model::DeviceSerial;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("invalid fleet-command base url '{url}': {reason}")]
    InvalidBase { url: String, reason: String },
    #[error("fleet-command base url '{0}' cannot carry a path")]
    CannotBeABase(String),
}

/// Builds `{base}/api/units/{serial}/{resource}` URLs for the fleet-command service.
#[derive(Debug, Clone)]
pub struct UnitAddressResolver {
    base: Url,
}

impl UnitAddressResolver {
    pub fn new(base: Url) -> Result<Self, AddressError> {
        if base.cannot_be_a_base() {
            return Err(AddressError::CannotBeABase(base.to_string()));
        }
        Ok(Self { base })
    }

    pub fn parse(raw: &str) -> Result<Self, AddressError> {
        let base = Url::parse(raw.trim()).map_err(|err| AddressError::InvalidBase {
            url: raw.to_string(),
            reason: err.to_string(),
        })?;
        Self::new(base)
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// The serial is pushed as one percent-encoded segment; callers pass it raw.
    pub fn resolve(
        &self,
        serial: &DeviceSerial,
        resource: UnitResource,
    ) -> Result<Url, AddressError> {
        let mut url = self.base.clone();
        url.set_query(None);
        url.set_fragment(None);
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| AddressError::CannotBeABase(self.base.to_string()))?;
            segments
                .pop_if_empty()
                .extend(UNITS_PATH)
                .push(serial.as_str())
                .extend(resource.segments());
        }
        Ok(url)
    }

    pub fn resolve_with_query(
        &self,
        serial: &DeviceSerial,
        resource: UnitResource,
        query: &[(&str, String)],
    ) -> Result<Url, AddressError> {
        let mut url = self.resolve(serial, resource)?;
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(key, value)| (*key, value.as_str())));
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use command_abi::StreamTarget;

    use super::*;

    fn serial(raw: &str) -> DeviceSerial {
        DeviceSerial::parse(Some(raw)).expect("serial should parse")
    }

    #[test]
    fn serial_is_escaped_as_a_single_segment() {
        let resolver = UnitAddressResolver::parse("http://fleet.local:9000").expect("base");
        let url = resolver
            .resolve(&serial("AB/12 34"), UnitResource::Command)
            .expect("url should resolve");
        assert_eq!(
            url.as_str(),
            "http://fleet.local:9000/api/units/AB%2F12%2034/command"
        );
    }

    #[test]
    fn logged_serial_matches_the_outbound_segment() {
        let resolver = UnitAddressResolver::parse("http://fleet.local").expect("base");
        for raw in ["AB/12 34", "a?b#c", "50%", "x\\y", "{<\"`>}", "caméra-ü", "UNIT_1.a~b"] {
            let serial = serial(raw);
            let url = resolver
                .resolve(&serial, UnitResource::Command)
                .expect("url should resolve");
            assert_eq!(url.path(), format!("/api/units/{serial}/command"), "{raw}");
        }
    }

    #[test]
    fn question_marks_and_hashes_stay_in_the_path() {
        let resolver = UnitAddressResolver::parse("http://fleet.local").expect("base");
        let url = resolver
            .resolve(&serial("a?b#c"), UnitResource::StreamStop)
            .expect("url should resolve");
        assert_eq!(url.path(), "/api/units/a%3Fb%23c/stream/stop");
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn base_path_prefix_and_trailing_slash_are_kept_once() {
        let resolver = UnitAddressResolver::parse("https://gw.example.com/fleet/").expect("base");
        let url = resolver
            .resolve(&serial("UNIT-7"), UnitResource::StreamStart)
            .expect("url should resolve");
        assert_eq!(
            url.as_str(),
            "https://gw.example.com/fleet/api/units/UNIT-7/stream/start"
        );
    }

    #[test]
    fn status_query_carries_camera_then_profile() {
        let resolver = UnitAddressResolver::parse("http://fleet.local:9000").expect("base");
        let target = StreamTarget::new("1", "main");
        let url = resolver
            .resolve_with_query(
                &serial("UNIT-1"),
                UnitResource::StreamStatus,
                &target.query_pairs(),
            )
            .expect("url should resolve");
        assert_eq!(url.path(), "/api/units/UNIT-1/stream/status");
        assert_eq!(url.query(), Some("camera=1&profile=main"));
    }

    #[test]
    fn base_query_does_not_leak_into_unit_urls() {
        let resolver = UnitAddressResolver::parse("http://fleet.local/?token=x#frag").expect("base");
        let url = resolver
            .resolve(&serial("UNIT-1"), UnitResource::Command)
            .expect("url should resolve");
        assert_eq!(url.as_str(), "http://fleet.local/api/units/UNIT-1/command");
    }

    #[test]
    fn opaque_and_malformed_bases_are_rejected() {
        assert!(matches!(
            UnitAddressResolver::parse("mailto:ops@example.com"),
            Err(AddressError::CannotBeABase(_))
        ));
        assert!(matches!(
            UnitAddressResolver::parse("not a url"),
            Err(AddressError::InvalidBase { .. })
        ));
    }
}
