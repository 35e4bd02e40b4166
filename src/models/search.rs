use validator::Validate;

#[derive(Debug, Clone, Validate)]
pub struct SearchParams {
    #[validate(required, length(min = 1))]
    pub q: Option<String>,
}

impl SearchParams {
    /// Builds the params from decoded query pairs. The first `q` wins when it is repeated.
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let q = pairs
            .into_iter()
            .find(|(key, _)| key == "q")
            .map(|(_, value)| value);

        SearchParams { q }
    }
}
