//! Output file naming.

use crate::settings::{NamingRule, WatermarkSettings};

/// Split a file name into stem and extension at the last dot.
///
/// A leading dot (`.hidden`) is part of the stem, not a separator. The
/// extension is returned without its dot.
pub fn split_file_name(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(index) if index > 0 => (&name[..index], Some(&name[index + 1..])),
        _ => (name, None),
    }
}

/// Derive the output file name for `original_name`.
///
/// The extension is replaced by the output format's and the naming rule is
/// applied to the stem.
///
/// ```
/// use photomark::export::export_file_name;
/// use photomark::settings::{NamingRule, OutputFormat, WatermarkSettings};
///
/// let mut settings = WatermarkSettings::default();
/// settings.export.naming_rule = NamingRule::Prefix;
/// settings.export.custom_text = "wm_".to_string();
/// settings.export.output_format = OutputFormat::Jpeg;
///
/// assert_eq!(export_file_name("photo.PNG", &settings), "wm_photo.jpg");
/// ```
pub fn export_file_name(original_name: &str, settings: &WatermarkSettings) -> String {
    let (stem, _) = split_file_name(original_name);
    let custom = &settings.export.custom_text;

    let name = match settings.export.naming_rule {
        NamingRule::KeepOriginal => stem.to_string(),
        NamingRule::Prefix => format!("{}{}", custom, stem),
        NamingRule::Suffix => format!("{}{}", stem, custom),
        NamingRule::Other => format!("{}_{}", stem, custom),
    };

    name + settings.export.output_format.extension()
}
