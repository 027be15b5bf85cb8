//! SUPI to GUTI assignment.

/// AMF region id stamped into every GUTI
pub const AMF_REGION: &str = "CA";
/// AMF set id
pub const AMF_SET: &str = "3FE";
/// AMF pointer
pub const AMF_POINTER: &str = "01";

/// Derive the GUTI of a SUPI: `guti-<mcc>-<mnc>-<region>-<set>-<pointer>-<tmsi>`.
///
/// `mcc`/`mnc` come from an `imsi-<mcc3><mnc2><msin>` SUPI (`000`/`00` when
/// the SUPI has another shape); the TMSI is the first four bytes of the
/// BLAKE3 digest of the SUPI in upper-case hex.
pub fn guti_for(supi: &str) -> String {
    let digits = supi.strip_prefix("imsi-").unwrap_or("");
    let (mcc, mnc) = match (digits.get(0..3), digits.get(3..5)) {
        (Some(mcc), Some(mnc)) if digits.bytes().all(|b| b.is_ascii_digit()) => (mcc, mnc),
        _ => ("000", "00"),
    };
    let digest = blake3::hash(supi.as_bytes());
    let tmsi = hex::encode_upper(&digest.as_bytes()[..4]);
    format!("guti-{mcc}-{mnc}-{AMF_REGION}-{AMF_SET}-{AMF_POINTER}-{tmsi}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn guti_carries_plmn_and_amf_identifiers() {
        let guti = guti_for("imsi-999010000000123");
        assert!(guti.starts_with("guti-999-01-CA-3FE-01-"), "{guti}");
        let tmsi = guti.rsplit('-').next().unwrap();
        assert_eq!(tmsi.len(), 8);
        assert!(tmsi.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn fixtures_do_not_collide() {
        let a = guti_for("imsi-999010000000123");
        let b = guti_for("imsi-999010000000124");
        let c = guti_for("imsi-999010000000125");
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn odd_supi_still_gets_a_guti() {
        assert!(guti_for("nai-user@example").starts_with("guti-000-00-"));
    }

    proptest! {
        #[test]
        fn derivation_is_pure(supi in "imsi-[0-9]{15}") {
            prop_assert_eq!(guti_for(&supi), guti_for(&supi));
        }
    }
}
