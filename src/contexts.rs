use serde::Serialize;

#[derive(Serialize)]
pub struct GniBlockContext<'a> {
    pub marker: &'a str,
    pub sources: &'a [String],
}
