use super::*;

#[test]
fn wire_names_are_stable() {
    assert_eq!(Ack::InitedMapSnapshot.to_string(), "initedMapSnapshot");
    assert_eq!(Ack::Inited.to_string(), "inited");
    assert_eq!(Ack::PbInited.to_string(), "pbInited");
    assert_eq!(Ack::PbStarted.to_string(), "pbStarted");
    assert_eq!(Ack::Tick.to_string(), "tick");
}

#[test]
fn reverse_is_comma_joined() {
    let ack = Ack::Reverse(vec![ColorCode(0), ColorCode(12), ColorCode(3)]);
    assert_eq!(ack.to_string(), "0,12,3");
    assert_eq!(Ack::Reverse(Vec::new()).to_string(), "");
}
