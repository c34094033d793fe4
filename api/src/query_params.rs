/// Ordered, multi-valued view of a raw query string.
///
/// The same key may repeat (`attr=a&attr=b`) and order is preserved, which the
/// filter grammar relies on for alias assignment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn parse(raw: &str) -> Self {
        let pairs = raw
            .split('&')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let (key, value) = part.split_once('=').unwrap_or((part, ""));
                (decode_component(key), decode_component(value))
            })
            .collect();
        Self { pairs }
    }

    pub fn from_request(req: &poem::Request) -> Self {
        Self::parse(req.uri().query().unwrap_or_default())
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Last non-empty value for `key`
    pub fn get_non_empty(&self, key: &str) -> Option<&str> {
        self.get_all(key).filter(|v| !v.is_empty()).last()
    }

    pub fn get_all<'a, 'k>(&'a self, key: &'k str) -> impl Iterator<Item = &'a str> + 'k
    where
        'a: 'k,
    {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(k, _)| k.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    pub fn has_key_with_prefix(&self, prefix: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k.starts_with(prefix))
    }

    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Copy without the given keys
    pub fn without(&self, keys: &[&str]) -> Self {
        Self {
            pairs: self
                .pairs
                .iter()
                .filter(|(k, _)| !keys.contains(&k.as_str()))
                .cloned()
                .collect(),
        }
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn to_query_string(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    urlencoding::encode(k),
                    urlencoding::encode(v)
                )
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_keeps_repeated_keys_in_order() {
        let params = QueryParams::parse("attr=a&limit=5&attr=b~c");
        let attrs: Vec<&str> = params.get_all("attr").collect();
        assert_eq!(attrs, vec!["a", "b~c"]);
        assert_eq!(params.get("limit"), Some("5"));
    }

    #[test]
    fn test_parse_decodes_brackets_and_spaces() {
        let params = QueryParams::parse("sc_0%5Bmodel%5D=Belly+Up&q=a%20b");
        assert_eq!(params.get("sc_0[model]"), Some("Belly Up"));
        assert_eq!(params.get("q"), Some("a b"));
    }

    #[test]
    fn test_values_outlive_the_lookup_key() {
        let params = QueryParams::parse("orderby=-name&orderby=&cursor=abc");
        let order = {
            let key = String::from("orderby");
            params.get_non_empty(&key)
        };
        assert_eq!(order, Some("-name"));
        let cursors: Vec<&str> = params.get_all(&"cursor".to_string()).collect();
        assert_eq!(cursors, vec!["abc"]);
    }

    #[test]
    fn test_key_without_value() {
        let params = QueryParams::parse("flag&x=1");
        assert!(params.contains_key("flag"));
        assert_eq!(params.get("flag"), Some(""));
        assert_eq!(params.get_non_empty("flag"), None);
    }

    #[test]
    fn test_without_and_round_trip() {
        let params = QueryParams::parse("attr=ns~a.b&page=2&limit=10");
        let stripped = params.without(&["page", "limit"]);
        assert_eq!(stripped.to_query_string(), "attr=ns~a.b");
        assert_eq!(QueryParams::parse(&stripped.to_query_string()), stripped);
    }

    #[test]
    fn test_empty_query() {
        let params = QueryParams::parse("");
        assert!(params.is_empty());
        assert_eq!(params.to_query_string(), "");
    }
}
