use mkt_kernel::SAFE_ALPHABET;
use mkt_kernel::safe_nanoid;

#[test]
fn generates_expected_length_and_charset() {
    let id = safe_nanoid!();
    assert_eq!(id.len(), 12);

    for ch in id.chars() {
        assert!(SAFE_ALPHABET.contains(&ch), "unexpected character in nanoid: {ch}");
    }
}

#[test]
fn in_app_secrets_use_the_configured_length() {
    let secret = safe_nanoid!(mkt_kernel::domain::constants::IN_APP_SECRET_LENGTH);
    assert_eq!(secret.len(), 48);
}

#[test]
fn slugs_are_lowercase_and_dashed() {
    assert_eq!(mkt_kernel::slugify("Star Map: Deluxe!"), "star-map-deluxe");
    assert_eq!(mkt_kernel::slugify("Ñandú"), "ñandú");
    assert_eq!(mkt_kernel::slugify("  "), "app");
}
