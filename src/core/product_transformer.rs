use crate::core::attribute_mapper::map_attributes;
use crate::core::price_parser::PriceParser;
use crate::core::reference_cache::ReferenceCache;
use crate::domain::model::{
    CreationRequest, Image, LocalizedText, ProductGroup, ProductSchema, Row, VariantDraft,
};
use crate::utils::error::{ImportError, Result};
use std::sync::Arc;

pub const SKU_COLUMN: &str = "sku";
pub const PRICES_COLUMN: &str = "prices";
pub const IMAGES_COLUMN: &str = "images";
pub const NAME_PREFIX: &str = "name";
pub const SLUG_PREFIX: &str = "slug";

#[derive(Debug, Clone)]
pub struct TransformSettings {
    pub schema_column: String,
    pub canonical_locale: String,
    pub secondary_locale: String,
    /// 次要語系名稱以此開頭的商品視為佔位資料
    pub excluded_name_prefix: String,
}

impl Default for TransformSettings {
    fn default() -> Self {
        Self {
            schema_column: "productType".to_string(),
            canonical_locale: "en".to_string(),
            secondary_locale: "de".to_string(),
            excluded_name_prefix: "#max".to_string(),
        }
    }
}

struct ProductEntry {
    schema_key: String,
    name: LocalizedText,
    slug: LocalizedText,
}

/// 把一個 ProductGroup 轉成商品建立請求
pub struct ProductTransformer {
    cache: Arc<ReferenceCache>,
    settings: TransformSettings,
}

impl ProductTransformer {
    pub fn new(cache: Arc<ReferenceCache>, settings: TransformSettings) -> Self {
        Self { cache, settings }
    }

    /// 回傳 None 表示此群組被過濾或無法對應，不視為錯誤
    pub async fn transform(&self, group: &ProductGroup) -> Result<Option<CreationRequest>> {
        let first = group.first();
        let entry = match self.product_entry(first) {
            Ok(entry) => entry,
            Err(e) if e.is_row_recoverable() => {
                tracing::warn!("⚠️ Line {}: skipping product: {}", first.line(), e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        let Some(schema) = self.cache.schema(&entry.schema_key).await? else {
            tracing::warn!(
                "⏭️ Line {}: product type '{}' not found, skipping product",
                first.line(),
                entry.schema_key
            );
            return Ok(None);
        };

        let mut variants = Vec::with_capacity(group.len());
        for row in group.rows() {
            match self.variant_draft(row, &schema).await {
                Ok(variant) => variants.push(variant),
                Err(e) if e.is_row_recoverable() => {
                    tracing::warn!("⚠️ Line {}: could not parse variant, skipping it: {}", row.line(), e);
                }
                Err(e) => return Err(e),
            }
        }

        let request = CreationRequest {
            product_type: schema.reference(),
            name: entry.name,
            slug: entry.slug,
            variants,
        };

        if !self.is_useful(&request) {
            tracing::debug!("🚫 Line {}: product filtered out by name rule", first.line());
            return Ok(None);
        }

        Ok(Some(request))
    }

    /// 主語系名稱為空，或次要語系名稱以排除前綴開頭時拒絕
    pub fn is_useful(&self, request: &CreationRequest) -> bool {
        let has_name = request
            .name
            .get(&self.settings.canonical_locale)
            .is_some_and(|name| !name.is_empty());
        let excluded = request
            .name
            .get(&self.settings.secondary_locale)
            .is_some_and(|name| name.starts_with(&self.settings.excluded_name_prefix));
        has_name && !excluded
    }

    fn product_entry(&self, row: &Row) -> Result<ProductEntry> {
        let schema_key = row
            .non_empty(&self.settings.schema_column)
            .ok_or_else(|| ImportError::FieldMappingError {
                line: row.line(),
                message: format!("missing product type in column '{}'", self.settings.schema_column),
            })?;

        Ok(ProductEntry {
            schema_key: schema_key.to_string(),
            name: row.localized(NAME_PREFIX),
            slug: row.localized(SLUG_PREFIX),
        })
    }

    async fn variant_draft(&self, row: &Row, schema: &ProductSchema) -> Result<VariantDraft> {
        let attributes = map_attributes(row, schema)?;
        let prices = PriceParser::new(&self.cache)
            .parse_prices(row.non_empty(PRICES_COLUMN))
            .await?;

        Ok(VariantDraft {
            sku: row.non_empty(SKU_COLUMN).map(str::to_string),
            prices,
            images: parse_images(row.non_empty(IMAGES_COLUMN)),
            attributes,
        })
    }
}

pub fn parse_images(raw: Option<&str>) -> Vec<Image> {
    raw.map(|raw| {
        raw.split(';')
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(Image::without_dimensions)
            .collect()
    })
    .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryCatalog;
    use crate::domain::model::{AttributeDefinition, AttributeKind, AttributeValue, Reference};
    use std::time::Duration;

    fn shirt_schema() -> ProductSchema {
        ProductSchema {
            id: "pt-shirt".to_string(),
            key: Some("shirt".to_string()),
            name: "Shirt".to_string(),
            attributes: vec![AttributeDefinition {
                name: "colors".to_string(),
                kind: AttributeKind::Set {
                    element_type: Box::new(AttributeKind::String),
                },
            }],
        }
    }

    fn transformer(catalog: InMemoryCatalog) -> (Arc<InMemoryCatalog>, ProductTransformer) {
        let catalog = Arc::new(catalog);
        let cache = Arc::new(ReferenceCache::new(catalog.clone(), Duration::from_secs(5)));
        (catalog, ProductTransformer::new(cache, TransformSettings::default()))
    }

    fn product_row(name_en: &str, name_de: &str, product_type: &str, sku: &str, prices: &str) -> Row {
        Row::from_pairs(
            2,
            &[
                ("productType", product_type),
                ("name.en", name_en),
                ("name.de", name_de),
                ("slug.en", "slug-en"),
                ("sku", sku),
                ("prices", prices),
                ("images", "https://img/1.jpg;https://img/2.jpg"),
                ("colors", "red;blue;red"),
            ],
        )
    }

    fn variant_row(line: usize, sku: &str, prices: &str) -> Row {
        Row::from_pairs(
            line,
            &[
                ("productType", ""),
                ("name.en", ""),
                ("sku", sku),
                ("prices", prices),
                ("images", ""),
                ("colors", ""),
            ],
        )
    }

    #[tokio::test]
    async fn test_transform_builds_request_with_all_variants() {
        let (_, transformer) = transformer(InMemoryCatalog::new().with_schema(shirt_schema()));
        let mut group = ProductGroup::new(product_row("Shirt", "Hemd", "shirt", "A-1", "EUR 1000"));
        group.push(variant_row(3, "A-2", "EUR 1200"));

        let request = transformer.transform(&group).await.unwrap().unwrap();

        assert_eq!(request.product_type, Reference::product_type("pt-shirt"));
        assert_eq!(request.name["en"], "Shirt");
        assert_eq!(request.slug["en"], "slug-en");
        assert_eq!(request.variants.len(), 2);

        let master = &request.variants[0];
        assert_eq!(master.sku.as_deref(), Some("A-1"));
        assert_eq!(master.prices[0].cent_amount, 1000);
        assert_eq!(master.images.len(), 2);
        assert_eq!(master.images[0], Image::without_dimensions("https://img/1.jpg"));
        match &master.attributes[0].value {
            AttributeValue::TextSet(colors) => assert_eq!(colors.len(), 2),
            other => panic!("expected set, got {:?}", other),
        }
        assert!(request.variants[1].attributes.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_schema_yields_nothing() {
        let (_, transformer) = transformer(InMemoryCatalog::new().with_schema(shirt_schema()));
        let group = ProductGroup::new(product_row("Hat", "Hut", "hat", "H-1", "EUR 10"));

        assert!(transformer.transform(&group).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_missing_product_type_skips_group() {
        let (_, transformer) = transformer(InMemoryCatalog::new().with_schema(shirt_schema()));
        let group = ProductGroup::new(product_row("Shirt", "Hemd", "", "A-1", "EUR 10"));

        assert!(transformer.transform(&group).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_price_excludes_only_that_variant() {
        let (_, transformer) = transformer(InMemoryCatalog::new().with_schema(shirt_schema()));
        let mut group = ProductGroup::new(product_row("Shirt", "Hemd", "shirt", "A-1", "EUR 1000"));
        group.push(variant_row(3, "A-2", "bogus"));
        group.push(variant_row(4, "A-3", "USD 5"));

        let request = transformer.transform(&group).await.unwrap().unwrap();
        let skus: Vec<_> = request.variants.iter().filter_map(|v| v.sku.as_deref()).collect();
        assert_eq!(skus, vec!["A-1", "A-3"]);
    }

    #[tokio::test]
    async fn test_empty_canonical_name_is_filtered() {
        let (_, transformer) = transformer(InMemoryCatalog::new().with_schema(shirt_schema()));
        let group = ProductGroup::new(product_row("", "Hemd", "shirt", "A-1", "EUR 1000"));

        assert!(transformer.transform(&group).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_placeholder_secondary_name_is_filtered() {
        let (_, transformer) = transformer(InMemoryCatalog::new().with_schema(shirt_schema()));
        let group = ProductGroup::new(product_row("Shirt", "#max test", "shirt", "A-1", "EUR 1000"));

        assert!(transformer.transform(&group).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unsupported_attribute_type_is_fatal() {
        let mut schema = shirt_schema();
        schema.attributes.push(AttributeDefinition {
            name: "weight".to_string(),
            kind: AttributeKind::Money,
        });
        let (_, transformer) = transformer(InMemoryCatalog::new().with_schema(schema));
        let group = ProductGroup::new(product_row("Shirt", "Hemd", "shirt", "A-1", "EUR 1000"));

        assert!(matches!(
            transformer.transform(&group).await,
            Err(ImportError::UnsupportedAttributeType { .. })
        ));
    }

    #[tokio::test]
    async fn test_customer_group_in_price_is_created_once_per_run() {
        let (catalog, transformer) = transformer(InMemoryCatalog::new().with_schema(shirt_schema()));
        let mut group = ProductGroup::new(product_row("Shirt", "Hemd", "shirt", "A-1", "EUR 900 b2b"));
        group.push(variant_row(3, "A-2", "EUR 800 b2b;DE-EUR 850 b2b"));

        let request = transformer.transform(&group).await.unwrap().unwrap();

        assert_eq!(catalog.calls().customer_group_creates, 1);
        let first = request.variants[0].prices[0].customer_group.clone();
        assert!(first.is_some());
        assert_eq!(request.variants[1].prices[1].customer_group, first);
    }

    #[test]
    fn test_parse_images_without_value() {
        assert!(parse_images(None).is_empty());
        assert!(parse_images(Some(";;")).is_empty());
    }
}
