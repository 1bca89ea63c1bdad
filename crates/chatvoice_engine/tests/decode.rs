use chatvoice_engine::decode_page;
use pretty_assertions::assert_eq;

#[test]
fn utf8_bom_is_stripped() {
    let decoded = decode_page(b"\xEF\xBB\xBF<p>hello</p>").unwrap();
    assert_eq!(decoded.html, "<p>hello</p>");
    assert_eq!(decoded.encoding_label, "UTF-8");
}

#[test]
fn utf16_bom_selects_utf16() {
    let decoded = decode_page(b"\xFF\xFEh\x00i\x00").unwrap();
    assert_eq!(decoded.html, "hi");
    assert_eq!(decoded.encoding_label, "UTF-16LE");
}

#[test]
fn plain_utf8_without_bom_is_detected() {
    let source = "<p>こんにちは、ありがとう、おつかれさまでした</p>";
    let decoded = decode_page(source.as_bytes()).unwrap();
    assert_eq!(decoded.html, source);
    assert_eq!(decoded.encoding_label, "UTF-8");
}

#[test]
fn legacy_single_byte_pages_are_converted() {
    let bytes = b"<p>Le caf\xe9 est tr\xe8s bon, d\xe9j\xe0 vu, \xe0 bient\xf4t.</p>";
    let decoded = decode_page(bytes).unwrap();
    assert_eq!(decoded.html, "<p>Le café est très bon, déjà vu, à bientôt.</p>");
}
