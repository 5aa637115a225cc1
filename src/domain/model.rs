use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

/// locale -> text
pub type LocalizedText = BTreeMap<String, String>;

/// 來源檔案的一列，欄位順序與表頭一致，讀取後不可變
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    line: usize,
    headers: Arc<[String]>,
    values: Vec<String>,
}

impl Row {
    pub fn new(line: usize, headers: Arc<[String]>, values: Vec<String>) -> Self {
        Self {
            line,
            headers,
            values,
        }
    }

    /// 以 (欄位, 值) 建立資料列，主要供測試與記憶體來源使用
    pub fn from_pairs(line: usize, pairs: &[(&str, &str)]) -> Self {
        let headers: Arc<[String]> = pairs.iter().map(|(k, _)| k.to_string()).collect();
        let values = pairs.iter().map(|(_, v)| v.to_string()).collect();
        Self::new(line, headers, values)
    }

    /// 來源檔案中的行號（從 1 開始，含表頭）
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        self.headers
            .iter()
            .position(|h| h == column)
            .and_then(|idx| self.values.get(idx))
            .map(String::as_str)
    }

    /// 缺欄或空字串皆視為沒有值
    pub fn non_empty(&self, column: &str) -> Option<&str> {
        self.get(column).filter(|v| !v.is_empty())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .zip(self.values.iter())
            .map(|(h, v)| (h.as_str(), v.as_str()))
    }

    /// 收集 `<prefix>.<locale>` 欄位中所有非空的值
    pub fn localized(&self, prefix: &str) -> LocalizedText {
        let dotted = format!("{}.", prefix);
        self.columns()
            .filter(|(_, value)| !value.is_empty())
            .filter_map(|(column, value)| {
                column
                    .strip_prefix(&dotted)
                    .filter(|locale| !locale.is_empty())
                    .map(|locale| (locale.to_string(), value.to_string()))
            })
            .collect()
    }
}

/// 同一個商品的連續資料列；第一列帶商品層級欄位，每一列都是一個 variant
#[derive(Debug, Clone, PartialEq)]
pub struct ProductGroup {
    rows: Vec<Row>,
}

impl ProductGroup {
    pub fn new(first: Row) -> Self {
        Self { rows: vec![first] }
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    pub fn first(&self) -> &Row {
        &self.rows[0]
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub type_id: String,
    pub id: String,
}

impl Reference {
    pub fn product_type(id: impl Into<String>) -> Self {
        Self {
            type_id: "product-type".to_string(),
            id: id.into(),
        }
    }

    pub fn customer_group(id: impl Into<String>) -> Self {
        Self {
            type_id: "customer-group".to_string(),
            id: id.into(),
        }
    }

    pub fn channel(id: impl Into<String>) -> Self {
        Self {
            type_id: "channel".to_string(),
            id: id.into(),
        }
    }
}

/// 遠端定義的商品結構（product type）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSchema {
    pub id: String,
    #[serde(default)]
    pub key: Option<String>,
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<AttributeDefinition>,
}

impl ProductSchema {
    pub fn reference(&self) -> Reference {
        Reference::product_type(self.id.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: AttributeKind,
}

/// 遠端宣告的屬性型別；`name` 為判別欄位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name")]
pub enum AttributeKind {
    #[serde(rename = "text")]
    String,
    #[serde(rename = "ltext")]
    LocalizedString,
    #[serde(rename = "enum")]
    Enum,
    #[serde(rename = "lenum")]
    LocalizedEnum,
    #[serde(rename = "boolean")]
    Boolean,
    #[serde(rename = "datetime")]
    DateTime,
    #[serde(rename = "set")]
    Set {
        #[serde(rename = "elementType")]
        element_type: Box<AttributeKind>,
    },
    #[serde(rename = "number")]
    Number,
    #[serde(rename = "money")]
    Money,
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "time")]
    Time,
    #[serde(rename = "reference")]
    Reference,
    #[serde(rename = "nested")]
    Nested,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeKind::String => write!(f, "text"),
            AttributeKind::LocalizedString => write!(f, "ltext"),
            AttributeKind::Enum => write!(f, "enum"),
            AttributeKind::LocalizedEnum => write!(f, "lenum"),
            AttributeKind::Boolean => write!(f, "boolean"),
            AttributeKind::DateTime => write!(f, "datetime"),
            AttributeKind::Set { element_type } => write!(f, "set<{}>", element_type),
            AttributeKind::Number => write!(f, "number"),
            AttributeKind::Money => write!(f, "money"),
            AttributeKind::Date => write!(f, "date"),
            AttributeKind::Time => write!(f, "time"),
            AttributeKind::Reference => write!(f, "reference"),
            AttributeKind::Nested => write!(f, "nested"),
            AttributeKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// 價格字串解析後、尚未解析參照前的結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceSpec {
    pub currency_code: String,
    pub cent_amount: u64,
    pub country_code: Option<String>,
    pub customer_group: Option<String>,
    pub channel_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceDraft {
    pub currency_code: String,
    pub cent_amount: u64,
    pub country_code: Option<String>,
    pub customer_group: Option<Reference>,
    pub channel: Option<Reference>,
}

/// 來源格式不含尺寸，寬高固定為 0
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

impl Image {
    pub fn without_dimensions(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            width: 0,
            height: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Text(String),
    Localized(LocalizedText),
    TextSet(BTreeSet<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeDraft {
    pub name: String,
    pub value: AttributeValue,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct VariantDraft {
    pub sku: Option<String>,
    pub prices: Vec<PriceDraft>,
    pub images: Vec<Image>,
    pub attributes: Vec<AttributeDraft>,
}

/// 送往遠端的商品建立請求；建立後不再修改
#[derive(Debug, Clone, PartialEq)]
pub struct CreationRequest {
    pub product_type: Reference,
    pub name: LocalizedText,
    pub slug: LocalizedText,
    pub variants: Vec<VariantDraft>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerGroup {
    pub id: String,
    pub name: String,
}
