//! SPE file parsing functionality

mod footer_parser;
mod header_parser;
mod metadata_parser;
pub mod pixel_parser;
mod settings_parser;
pub mod xml_tree;

// Re-export the parsing functions
pub use footer_parser::{Footer, parse_footer};
pub use header_parser::{parse_header, parse_legacy_header};
pub use metadata_parser::{parse_all_frame_metadata, parse_frame_metadata, parse_meta_value};
pub use pixel_parser::{PixelElement, decode_region, decode_region_data};
pub use settings_parser::{SettingRule, builtin_rules, extract_settings};
pub use xml_tree::{XmlNode, parse_xml_tree, pretty_print};
