use super::*;

fn three() -> Palette {
    Palette::new(vec![Rgb(0xFFFFFF), Rgb(0xFF0000), Rgb(0x0000FF)]).unwrap()
}

#[test]
fn code_and_reverse_are_consistent() {
    let p = three();
    for (i, &rgb) in p.colors().iter().enumerate() {
        let code = ColorCode(i as u8);
        assert_eq!(p.color(code).unwrap(), rgb);
        assert_eq!(p.reverse_of(rgb), Some(code));
    }
}

#[test]
fn white_falls_back_to_blank_code() {
    let p = Palette::new(vec![Rgb(0x000000), Rgb(0x00FF00)]).unwrap();
    assert_eq!(p.reverse_of(Rgb::WHITE), Some(ColorCode::BLANK));
    assert_eq!(p.reverse_of(Rgb(0x123456)), None);
}

#[test]
fn duplicate_colours_are_rejected() {
    let err = Palette::new(vec![Rgb(1), Rgb(2), Rgb(1)]).unwrap_err();
    assert!(err.to_string().contains("appears at codes 0 and 2"));
}

#[test]
fn size_limits() {
    assert!(Palette::new(Vec::new()).is_err());
    let many = (0..37).map(Rgb).collect::<Vec<_>>();
    assert!(Palette::new(many).is_err());
}

#[test]
fn unknown_code_is_protocol_error() {
    let err = three().color(ColorCode(3)).unwrap_err();
    assert!(matches!(err, PixelwallError::Protocol(_)));
}

#[test]
fn from_hex_codes_parses_wire_fields() {
    let p = Palette::from_hex_codes(["ffffff", "#000000"]).unwrap();
    assert_eq!(p.colors(), &[Rgb::WHITE, Rgb(0)]);
    assert!(Palette::from_hex_codes(["ffffff", "nothex"]).is_err());
}
