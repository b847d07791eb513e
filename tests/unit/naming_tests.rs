// Output file naming tests

use photomark::export::export_file_name;
use photomark::settings::{NamingRule, OutputFormat, WatermarkSettings};
use rstest::rstest;

fn settings(rule: NamingRule, custom: &str, format: OutputFormat) -> WatermarkSettings {
    let mut settings = WatermarkSettings::default();
    settings.export.naming_rule = rule;
    settings.export.custom_text = custom.to_string();
    settings.export.output_format = format;
    settings
}

#[rstest]
#[case("photo.PNG", NamingRule::Prefix, "wm_", OutputFormat::Jpeg, "wm_photo.jpg")]
#[case("a.b.jpg", NamingRule::Suffix, "_done", OutputFormat::Png, "a.b_done.png")]
#[case("IMG_0001.jpeg", NamingRule::KeepOriginal, "ignored", OutputFormat::Jpeg, "IMG_0001.jpg")]
#[case("scan.tiff", NamingRule::KeepOriginal, "", OutputFormat::Png, "scan.png")]
#[case("noext", NamingRule::Suffix, "-wm", OutputFormat::Jpeg, "noext-wm.jpg")]
#[case(".hidden", NamingRule::Prefix, "x", OutputFormat::Png, "x.hidden.png")]
#[case("trailing.", NamingRule::Suffix, "_s", OutputFormat::Png, "trailing_s.png")]
#[case("shot.jpg", NamingRule::Other, "mark", OutputFormat::Jpeg, "shot_mark.jpg")]
#[case("shot.jpg", NamingRule::Prefix, "", OutputFormat::Jpeg, "shot.jpg")]
fn test_export_file_name(
    #[case] original: &str,
    #[case] rule: NamingRule,
    #[case] custom: &str,
    #[case] format: OutputFormat,
    #[case] expected: &str,
) {
    assert_eq!(export_file_name(original, &settings(rule, custom, format)), expected);
}
