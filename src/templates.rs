pub const GNI_BLOCK: &str = include_str!("templates/gni_block.tmpl");
