use mkt_domain::catalog::{DeviceType, FormFactor, Platform, Region};
use mkt_domain::listing::{device_types, from_device_types};
use proptest::prelude::*;
use std::collections::BTreeSet;

#[test]
fn legacy_devices_map_to_one_pair_each() {
    let expected = [
        (DeviceType::Desktop, Platform::Desktop, FormFactor::Desktop),
        (DeviceType::AndroidMobile, Platform::Android, FormFactor::Mobile),
        (DeviceType::AndroidTablet, Platform::Android, FormFactor::Tablet),
        (DeviceType::FirefoxOs, Platform::FirefoxOs, FormFactor::Mobile),
    ];
    for (device, platform, form_factor) in expected {
        assert_eq!(device.platform(), platform);
        assert_eq!(device.form_factor(), form_factor);
    }
}

#[test]
fn api_names_round_trip_through_lookup() {
    for device in DeviceType::ALL {
        assert_eq!(DeviceType::from_api_name(device.api_name()), Some(device));
    }
    assert_eq!(DeviceType::from_api_name("mobile"), None);
}

#[test]
fn android_requires_matching_form_factor() {
    let platforms = BTreeSet::from([Platform::Android]);
    let forms = BTreeSet::from([FormFactor::Desktop]);
    assert!(device_types(&platforms, &forms).is_empty());

    let forms = BTreeSet::from([FormFactor::Mobile, FormFactor::Tablet]);
    assert_eq!(
        device_types(&platforms, &forms),
        vec![DeviceType::AndroidMobile, DeviceType::AndroidTablet]
    );
}

#[test]
fn every_device_has_its_own_pair() {
    let pairs: BTreeSet<_> = DeviceType::ALL.iter().map(|d| (d.platform(), d.form_factor())).collect();
    assert_eq!(pairs.len(), DeviceType::ALL.len());
}

#[test]
fn regions_are_addressable() {
    assert_eq!(Region::by_slug("us").map(|r| r.id), Some(2));
    assert!(Region::by_slug("us").is_some_and(Region::is_mature));
    assert!(!Region::worldwide().is_mature());
    assert_eq!(Region::by_id(7).map(|r| r.slug), Some("br"));
}

fn device() -> impl Strategy<Value = DeviceType> {
    prop::sample::select(DeviceType::ALL.to_vec())
}

proptest! {
    #[test]
    fn distinct_devices_map_to_distinct_pairs(a in device(), b in device()) {
        let same_pair = (a.platform(), a.form_factor()) == (b.platform(), b.form_factor());
        prop_assert_eq!(a == b, same_pair);
    }

    #[test]
    fn translated_devices_are_recovered(devices in prop::collection::btree_set(device(), 1..4)) {
        let devices: Vec<_> = devices.into_iter().collect();
        let (platforms, forms) = from_device_types(&devices);
        let recovered = device_types(&platforms, &forms);
        for d in &devices {
            prop_assert!(recovered.contains(d));
        }
    }
}
