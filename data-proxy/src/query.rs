use crate::address::extract_zipcode;
use crate::errors::ProxyError;

/// Inputs accepted by every data-proxy endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProxyQuery {
    pub address: Option<String>,
    pub zipcode: Option<String>,
    /// Endpoint-specific selector, e.g. `Sale` or `Rental` for market stats.
    pub data_type: Option<String>,
}

impl ProxyQuery {
    /// Parses the raw query string of an inbound request. Blank values are
    /// treated as absent.
    pub fn from_query(query: &str) -> Self {
        let mut parsed = ProxyQuery::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_ref() {
                "address" => &mut parsed.address,
                "zipcode" | "zipCode" | "zip" => &mut parsed.zipcode,
                "dataType" | "data_type" => &mut parsed.data_type,
                _ => continue,
            };
            *slot = Some(value.to_string());
        }
        parsed
    }

    pub fn require_address(&self) -> Result<&str, ProxyError> {
        self.address
            .as_deref()
            .ok_or(ProxyError::MissingParameter("address"))
    }

    /// The explicit zipcode, or the one found in the address.
    pub fn resolve_zipcode(&self) -> Result<String, ProxyError> {
        if let Some(zipcode) = &self.zipcode {
            return extract_zipcode(zipcode).ok_or_else(|| ProxyError::InvalidParameter {
                name: "zipcode",
                value: zipcode.clone(),
            });
        }

        match &self.address {
            Some(address) => extract_zipcode(address).ok_or_else(|| ProxyError::InvalidParameter {
                name: "address",
                value: address.clone(),
            }),
            None => Err(ProxyError::MissingParameter("zipcode")),
        }
    }
}
