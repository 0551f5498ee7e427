//! Single-pass quotation builder.
//!
//! One pass over the workbook, no backtracking: structural problems (a
//! required sheet missing) abort immediately, every field-level problem is
//! collected with sheet/row/field attribution, and the terminal decision is
//! all-or-nothing. The caller gets either a complete submit-ready payload or
//! the complete list of actionable errors, never a partially valid payload.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::catalog::{Article, ArticleLookup, LookupError};
use crate::domain::{
    Address, ArticleId, Customer, LineItem, LineItemType, OfferMetadata, QuotationPayload,
    TaxConditions, TaxType, TotalPrice, UnitPrice,
};
use crate::errors::ValidationSummary;
use crate::pricing::{self, PriceError};
use crate::sheet::{
    section_field, section_values, RowSchema, Sheet, Workbook, LINE_ITEM_FIELDS, SHEET_CUSTOMER,
    SHEET_LINE_ITEMS, SHEET_OFFER,
};

/// Row-validation knobs the repository variants disagree on, lifted into
/// configuration instead of hard-coding one variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BuilderPolicy {
    /// Honor a spreadsheet-supplied price on rows that also carry an
    /// `articleId`. `material` rows ignore this and always price from the
    /// catalog.
    pub honor_supplied_price: bool,
    /// Whether `service` rows require an `articleId` like `material` rows do.
    pub service_requires_article: bool,
}

/// Outcome of one validation pass. `payload` and a non-empty `errors` list
/// are mutually exclusive.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildOutcome {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<QuotationPayload>,
    pub summary: ValidationSummary,
}

pub struct QuotationBuilder<'a> {
    lookup: &'a dyn ArticleLookup,
    policy: BuilderPolicy,
}

impl<'a> QuotationBuilder<'a> {
    pub fn new(lookup: &'a dyn ArticleLookup, policy: BuilderPolicy) -> Self {
        Self { lookup, policy }
    }

    pub async fn build(&self, workbook: &Workbook) -> BuildOutcome {
        let mut summary = ValidationSummary::default();

        let offer_sheet = workbook.sheet(SHEET_OFFER);
        let customer_sheet = workbook.sheet(SHEET_CUSTOMER);
        let items_sheet = workbook.sheet(SHEET_LINE_ITEMS);

        for (name, present) in [
            (SHEET_OFFER, offer_sheet.is_some()),
            (SHEET_CUSTOMER, customer_sheet.is_some()),
            (SHEET_LINE_ITEMS, items_sheet.is_some()),
        ] {
            if !present {
                summary.error(name, 1, "sheet", format!("required sheet `{name}` is missing"));
            }
        }

        let (Some(offer_sheet), Some(customer_sheet), Some(items_sheet)) =
            (offer_sheet, customer_sheet, items_sheet)
        else {
            warn!(
                event_name = "quotation.build.structural_failure",
                missing_sheets = summary.errors.len(),
                "required sheets missing, row validation skipped"
            );
            return BuildOutcome { payload: None, summary };
        };

        let metadata = extract_metadata(offer_sheet, &mut summary);
        let customer = extract_customer(customer_sheet, &mut summary);

        let schema = RowSchema::resolve(&items_sheet.header, LINE_ITEM_FIELDS);
        let mut line_items = Vec::new();
        for (index, row) in items_sheet.rows.iter().enumerate() {
            let row_number = index as u32 + 2;
            if schema.is_blank(row) {
                continue;
            }
            if let Some(item) =
                self.build_line_item(&schema, row, row_number, &metadata, &mut summary).await
            {
                line_items.push(item);
            }
        }

        if !summary.is_ok() {
            info!(
                event_name = "quotation.build.rejected",
                error_count = summary.errors.len(),
                warning_count = summary.warnings.len(),
                "validation pass rejected the input"
            );
            return BuildOutcome { payload: None, summary };
        }

        let payload = QuotationPayload {
            voucher_date: metadata.voucher_date.clone(),
            expiration_date: metadata.expiration_date.clone(),
            address: Address::from_customer(&customer),
            line_items,
            tax_conditions: TaxConditions { tax_type: metadata.tax_type },
            total_price: TotalPrice { currency: metadata.currency.clone() },
            title: metadata.title.clone(),
            introduction: metadata.introduction.clone(),
            remark: metadata.remark.clone(),
        };
        info!(
            event_name = "quotation.build.accepted",
            line_item_count = payload.line_items.len(),
            warning_count = summary.warnings.len(),
            "payload assembled"
        );
        BuildOutcome { payload: Some(payload), summary }
    }

    /// Validates one non-blank row. Returns the line item, or `None` after
    /// recording exactly one row error; later rows keep being processed
    /// either way.
    async fn build_line_item(
        &self,
        schema: &RowSchema,
        row: &[String],
        row_number: u32,
        metadata: &OfferMetadata,
        summary: &mut ValidationSummary,
    ) -> Option<LineItem> {
        let Some(raw_type) = schema.value(row, "type") else {
            summary.error(SHEET_LINE_ITEMS, row_number, "type", "type is required");
            return None;
        };
        let Some(item_type) = LineItemType::parse(raw_type) else {
            summary.error(
                SHEET_LINE_ITEMS,
                row_number,
                "type",
                format!("unrecognized line item type `{raw_type}`"),
            );
            return None;
        };
        summary.tally(item_type);

        let article_id = schema.value(row, "articleId").map(str::to_string);
        let raw_name = schema.value(row, "name").map(str::to_string);
        let description = schema.value(row, "description").map(str::to_string);

        if item_type == LineItemType::Text {
            let name = match (raw_name, &description) {
                (Some(name), _) => name,
                (None, Some(description)) => description.clone(),
                (None, None) => {
                    let synthesized = format!("Hinweis {row_number}");
                    summary.auto_named(row_number, None, &synthesized);
                    synthesized
                }
            };
            return Some(LineItem {
                item_type,
                article_id: article_id.map(ArticleId),
                name,
                description,
                quantity: None,
                unit_name: None,
                unit_price: None,
                discount_percentage: None,
            });
        }

        let quantity = match schema.value(row, "quantity") {
            Some(raw) => match pricing::parse_decimal(raw) {
                Some(quantity) if quantity > Decimal::ZERO => quantity,
                _ => {
                    summary.error(
                        SHEET_LINE_ITEMS,
                        row_number,
                        "quantity",
                        format!("quantity must be a positive number, got `{raw}`"),
                    );
                    return None;
                }
            },
            None => {
                summary.error(SHEET_LINE_ITEMS, row_number, "quantity", "quantity is required");
                return None;
            }
        };

        let Some(unit_name) = schema.value(row, "unitName") else {
            summary.error(SHEET_LINE_ITEMS, row_number, "unitName", "unitName is required");
            return None;
        };

        let article_required = item_type == LineItemType::Material
            || (item_type == LineItemType::Service && self.policy.service_requires_article);
        if article_required && article_id.is_none() {
            summary.error(
                SHEET_LINE_ITEMS,
                row_number,
                "articleId",
                format!("articleId is required for {} items", item_type.as_str()),
            );
            return None;
        }

        let supplied =
            schema.value(row, "unitPriceAmount").and_then(pricing::parse_decimal);
        let tax_rate =
            schema.value(row, "taxRatePercentage").and_then(pricing::parse_decimal);
        let discount_percentage =
            schema.value(row, "discountPercent").and_then(pricing::parse_decimal);

        let use_supplied = supplied.is_some()
            && (article_id.is_none()
                || (self.policy.honor_supplied_price && item_type != LineItemType::Material));
        let needs_title = raw_name.is_none() && article_id.is_some();
        let needs_catalog_price = !use_supplied && article_id.is_some();

        // One catalog round-trip per row at most; title and price reuse it.
        let article: Option<Result<Option<Article>, LookupError>> =
            if needs_title || needs_catalog_price {
                let id = article_id.as_deref().unwrap_or_default();
                Some(self.lookup.article_by_id(id).await)
            } else {
                None
            };

        let resolved = if use_supplied {
            let amount = supplied.unwrap_or_default();
            Ok(pricing::from_supplied_amount(
                metadata.tax_type,
                amount,
                tax_rate,
                metadata.tax_rate_default,
                &metadata.currency,
            ))
        } else if let Some(id) = article_id.as_deref() {
            resolve_catalog_price(metadata, id, article.as_ref())
        } else {
            Err(PriceError::MissingAmount)
        };

        let unit_price = match resolved {
            Ok(unit_price) => unit_price,
            Err(err) => {
                summary.error(SHEET_LINE_ITEMS, row_number, "unitPriceAmount", err.to_string());
                return None;
            }
        };

        if needs_catalog_price {
            if supplied.is_some() {
                summary.warning(
                    SHEET_LINE_ITEMS,
                    row_number,
                    "supplied price ignored, price filled automatically from the catalog",
                );
            } else {
                summary.warning(
                    SHEET_LINE_ITEMS,
                    row_number,
                    "price filled automatically from the catalog",
                );
            }
        }

        let name = match (raw_name, article_id.as_deref()) {
            (Some(name), _) => name,
            (None, Some(id)) => {
                let title = match article.as_ref() {
                    Some(Ok(Some(found))) => {
                        found.title.clone().filter(|title| !title.trim().is_empty())
                    }
                    _ => None,
                };
                let name = title.unwrap_or_else(|| format!("Artikel {id}"));
                summary.warning(
                    SHEET_LINE_ITEMS,
                    row_number,
                    format!("name filled automatically as `{name}`"),
                );
                summary.auto_named(row_number, Some(id), &name);
                name
            }
            (None, None) => {
                let synthesized = format!("Position {row_number}");
                summary.auto_named(row_number, None, &synthesized);
                synthesized
            }
        };

        Some(LineItem {
            item_type,
            article_id: article_id.map(ArticleId),
            name,
            description,
            quantity: Some(quantity),
            unit_name: Some(unit_name.to_string()),
            unit_price: Some(unit_price),
            discount_percentage,
        })
    }
}

fn resolve_catalog_price(
    metadata: &OfferMetadata,
    article_id: &str,
    article: Option<&Result<Option<Article>, LookupError>>,
) -> Result<UnitPrice, PriceError> {
    match article {
        Some(Ok(Some(found))) => match &found.price {
            Some(price) => pricing::from_catalog_price(
                metadata.tax_type,
                article_id,
                price,
                metadata.tax_rate_default,
                &metadata.currency,
            ),
            None => Err(PriceError::IncompleteCatalogPrice(article_id.to_string())),
        },
        Some(Ok(None)) => Err(PriceError::ArticleNotFound(article_id.to_string())),
        Some(Err(err)) => Err(PriceError::Lookup {
            article_id: article_id.to_string(),
            message: err.to_string(),
        }),
        None => Err(PriceError::MissingAmount),
    }
}

fn extract_metadata(sheet: &Sheet, summary: &mut ValidationSummary) -> OfferMetadata {
    let values = section_values(sheet);

    let tax_type = match section_field(&values, &["taxtype"]) {
        Some(raw) => match TaxType::parse(raw) {
            Some(tax_type) => Some(tax_type),
            None => {
                summary.error(
                    SHEET_OFFER,
                    2,
                    "taxType",
                    format!("taxType must be `net` or `gross`, got `{raw}`"),
                );
                None
            }
        },
        None => {
            summary.error(SHEET_OFFER, 2, "taxType", "taxType is required");
            None
        }
    };

    let tax_rate_default = match section_field(&values, &["taxratedefault"]) {
        Some(raw) => match pricing::parse_decimal(raw) {
            Some(rate) => rate,
            None => {
                summary.warning(
                    SHEET_OFFER,
                    2,
                    format!("taxRateDefault `{raw}` is not a number, using 19"),
                );
                pricing::default_tax_rate()
            }
        },
        None => pricing::default_tax_rate(),
    };

    let owned = |aliases: &[&str]| section_field(&values, aliases).map(str::to_string);

    OfferMetadata {
        // A missing taxType is already recorded as an error above; `net`
        // merely keeps row validation going so the pass stays complete.
        tax_type: tax_type.unwrap_or(TaxType::Net),
        voucher_date: owned(&["voucherdate"]),
        expiration_date: owned(&["expirationdate"]),
        currency: owned(&["currency"]).unwrap_or_else(|| pricing::DEFAULT_CURRENCY.to_string()),
        tax_rate_default,
        title: owned(&["title"]),
        introduction: owned(&["introduction"]),
        remark: owned(&["remark"]),
    }
}

fn extract_customer(sheet: &Sheet, summary: &mut ValidationSummary) -> Customer {
    let values = section_values(sheet);
    let owned = |aliases: &[&str]| section_field(&values, aliases).map(str::to_string);

    let name = owned(&["name"]).unwrap_or_default();
    if name.is_empty() {
        summary.error(SHEET_CUSTOMER, 2, "name", "name is required");
    }

    Customer {
        name,
        contact_id: owned(&["contactid"]),
        street: owned(&["street"]),
        zip: owned(&["zip"]),
        city: owned(&["city"]),
        country_code: owned(&["countrycode"]).unwrap_or_else(|| "DE".to_string()),
        email: owned(&["email"]),
        contact_person: owned(&["contactperson"]),
        phone: owned(&["phone"]),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use rust_decimal::Decimal;

    use crate::catalog::{Article, ArticleLookup, ArticlePrice, LookupError, OfflineArticleLookup};
    use crate::domain::LineItemType;
    use crate::sheet::{Sheet, Workbook, SHEET_CUSTOMER, SHEET_LINE_ITEMS, SHEET_OFFER};

    use super::{BuilderPolicy, QuotationBuilder};

    fn dec(raw: &str) -> Decimal {
        raw.parse().expect("decimal literal")
    }

    struct MapLookup {
        articles: HashMap<String, Article>,
        calls: AtomicUsize,
    }

    impl MapLookup {
        fn new(articles: Vec<(&str, Article)>) -> Self {
            Self {
                articles: articles.into_iter().map(|(id, a)| (id.to_string(), a)).collect(),
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ArticleLookup for MapLookup {
        async fn article_by_id(&self, id: &str) -> Result<Option<Article>, LookupError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.articles.get(id).cloned())
        }
    }

    fn strs(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|cell| cell.to_string()).collect()
    }

    fn vertical_sheet(entries: &[(&str, &str)]) -> Sheet {
        Sheet::new(
            strs(&["field", "value"]),
            entries.iter().map(|(field, value)| strs(&[field, value])).collect(),
        )
    }

    fn workbook(
        offer: &[(&str, &str)],
        customer: &[(&str, &str)],
        item_header: &[&str],
        items: &[&[&str]],
    ) -> Workbook {
        let mut workbook = Workbook::new();
        workbook.insert(SHEET_OFFER, vertical_sheet(offer));
        workbook.insert(SHEET_CUSTOMER, vertical_sheet(customer));
        workbook.insert(
            SHEET_LINE_ITEMS,
            Sheet::new(strs(item_header), items.iter().map(|row| strs(row)).collect()),
        );
        workbook
    }

    const ITEM_HEADER: &[&str] =
        &["type", "articleId", "name", "description", "quantity", "unitName", "unitPriceAmount"];

    #[tokio::test]
    async fn missing_sheets_abort_before_row_validation() {
        let mut incomplete = Workbook::new();
        incomplete.insert(SHEET_OFFER, vertical_sheet(&[("taxType", "net")]));

        let lookup = OfflineArticleLookup;
        let outcome = QuotationBuilder::new(&lookup, BuilderPolicy::default())
            .build(&incomplete)
            .await;

        assert!(outcome.payload.is_none());
        assert_eq!(outcome.summary.errors.len(), 2);
        assert!(outcome
            .summary
            .errors
            .iter()
            .all(|error| error.field == "sheet" && error.row == 1));
    }

    #[tokio::test]
    async fn empty_customer_name_yields_exactly_one_error_and_no_payload() {
        let input = workbook(
            &[("taxType", "net")],
            &[("name", "")],
            ITEM_HEADER,
            &[&["custom", "", "Beratung", "", "5", "Stk", "6.9"]],
        );

        let lookup = OfflineArticleLookup;
        let outcome =
            QuotationBuilder::new(&lookup, BuilderPolicy::default()).build(&input).await;

        assert!(outcome.payload.is_none());
        assert_eq!(outcome.summary.errors.len(), 1);
        let error = &outcome.summary.errors[0];
        assert_eq!(error.sheet, SHEET_CUSTOMER);
        assert_eq!(error.field, "name");
        assert_eq!(outcome.summary.by_type.get(&LineItemType::Custom), Some(&1));
    }

    #[tokio::test]
    async fn material_price_is_filled_from_catalog_with_warning() {
        let input = workbook(
            &[("taxType", "gross")],
            &[("name", "Acme GmbH")],
            ITEM_HEADER,
            &[&["material", "abc-1", "Schraube", "", "10", "Stk", ""]],
        );
        let lookup = MapLookup::new(vec![(
            "abc-1",
            Article {
                title: Some("Schraube M4".to_string()),
                price: Some(ArticlePrice {
                    net_price: None,
                    gross_price: Some(dec("5.95")),
                    tax_rate: Some(dec("19")),
                }),
            },
        )]);

        let outcome =
            QuotationBuilder::new(&lookup, BuilderPolicy::default()).build(&input).await;

        let payload = outcome.payload.expect("payload");
        assert_eq!(payload.line_items.len(), 1);
        let unit_price = payload.line_items[0].unit_price.as_ref().expect("unit price");
        assert_eq!(unit_price.gross_amount, Some(dec("5.95")));
        assert_eq!(unit_price.net_amount, None);
        assert!(outcome
            .summary
            .warnings
            .iter()
            .any(|warning| warning.message.contains("price filled automatically")));
    }

    #[tokio::test]
    async fn comma_decimal_separator_parses_as_fraction() {
        let input = workbook(
            &[("taxType", "net")],
            &[("name", "Acme GmbH")],
            ITEM_HEADER,
            &[&["custom", "", "Beratung", "", "1", "h", "6,9"]],
        );

        let lookup = OfflineArticleLookup;
        let outcome =
            QuotationBuilder::new(&lookup, BuilderPolicy::default()).build(&input).await;

        let payload = outcome.payload.expect("payload");
        let unit_price = payload.line_items[0].unit_price.as_ref().expect("unit price");
        assert_eq!(unit_price.net_amount, Some(dec("6.9")));
    }

    #[tokio::test]
    async fn text_rows_never_produce_quantity_or_price_errors() {
        let input = workbook(
            &[("taxType", "net")],
            &[("name", "Acme GmbH")],
            ITEM_HEADER,
            &[
                &["text", "", "", "Lieferzeit 2 Wochen", "not-a-number", "", "garbage"],
                &["text", "", "", "", "", "", ""],
            ],
        );

        let lookup = OfflineArticleLookup;
        let outcome =
            QuotationBuilder::new(&lookup, BuilderPolicy::default()).build(&input).await;

        let payload = outcome.payload.expect("payload");
        assert!(outcome
            .summary
            .errors
            .iter()
            .all(|error| error.field != "quantity" && error.field != "unitPriceAmount"));
        assert_eq!(payload.line_items[0].name, "Lieferzeit 2 Wochen");
        assert_eq!(payload.line_items[1].name, "Hinweis 3");
        assert_eq!(outcome.summary.auto_named_line_items.len(), 1);
        assert_eq!(outcome.summary.auto_named_line_items[0].row, 3);
    }

    #[tokio::test]
    async fn material_without_article_id_is_rejected_with_field_attribution() {
        let input = workbook(
            &[("taxType", "net")],
            &[("name", "Acme GmbH")],
            ITEM_HEADER,
            &[&["material", "", "Schraube", "", "10", "Stk", "1.50"]],
        );

        let lookup = OfflineArticleLookup;
        let outcome =
            QuotationBuilder::new(&lookup, BuilderPolicy::default()).build(&input).await;

        assert!(outcome.payload.is_none());
        let article_errors: Vec<_> = outcome
            .summary
            .errors
            .iter()
            .filter(|error| error.field == "articleId")
            .collect();
        assert_eq!(article_errors.len(), 1);
        assert_eq!(article_errors[0].row, 2);
    }

    #[tokio::test]
    async fn emitted_items_plus_row_errors_equal_non_blank_rows() {
        let input = workbook(
            &[("taxType", "net")],
            &[("name", "Acme GmbH")],
            ITEM_HEADER,
            &[
                &["custom", "", "Beratung", "", "5", "Stk", "6.9"],
                &["", "", "", "", "", "", ""],
                &["custom", "", "Montage", "", "0", "Stk", "6.9"],
                &["gadget", "", "Unbekannt", "", "1", "Stk", "1"],
                &["text", "", "", "Hinweistext", "", "", ""],
            ],
        );

        let lookup = OfflineArticleLookup;
        let outcome =
            QuotationBuilder::new(&lookup, BuilderPolicy::default()).build(&input).await;

        let row_errors = outcome
            .summary
            .errors
            .iter()
            .filter(|error| error.sheet == SHEET_LINE_ITEMS)
            .count();
        // 4 non-blank rows: 2 items + 2 row errors.
        assert_eq!(row_errors, 2);
        assert!(outcome.payload.is_none());
        // The unrecognized type on row 5 is attributed to its `type` field
        // and was never classified.
        assert!(outcome
            .summary
            .errors
            .iter()
            .any(|error| error.row == 5 && error.field == "type"));
        assert_eq!(outcome.summary.by_type.get(&LineItemType::Custom), Some(&2));
        assert_eq!(outcome.summary.by_type.get(&LineItemType::Text), Some(&1));
    }

    #[tokio::test]
    async fn identical_input_builds_byte_identical_outcomes() {
        let input = workbook(
            &[("taxType", "gross"), ("voucherDate", "2024-03-01"), ("currency", "EUR")],
            &[("name", "Acme GmbH"), ("city", "Berlin")],
            ITEM_HEADER,
            &[&["material", "abc-1", "", "", "10", "Stk", ""]],
        );
        let lookup = MapLookup::new(vec![(
            "abc-1",
            Article {
                title: Some("Schraube M4".to_string()),
                price: Some(ArticlePrice {
                    net_price: Some(dec("5")),
                    gross_price: Some(dec("5.95")),
                    tax_rate: Some(dec("19")),
                }),
            },
        )]);
        let builder = QuotationBuilder::new(&lookup, BuilderPolicy::default());

        let first = builder.build(&input).await;
        let second = builder.build(&input).await;

        assert_eq!(first, second);
        let first_json = serde_json::to_string(&first).expect("serialize");
        let second_json = serde_json::to_string(&second).expect("serialize");
        assert_eq!(first_json, second_json);
    }

    #[tokio::test]
    async fn supplied_price_on_article_rows_is_discarded_unless_honored() {
        let input = workbook(
            &[("taxType", "net")],
            &[("name", "Acme GmbH")],
            ITEM_HEADER,
            &[&["service", "srv-1", "Wartung", "", "1", "h", "99"]],
        );
        let article = Article {
            title: None,
            price: Some(ArticlePrice {
                net_price: Some(dec("80")),
                gross_price: None,
                tax_rate: Some(dec("19")),
            }),
        };

        let lookup = MapLookup::new(vec![("srv-1", article.clone())]);
        let outcome = QuotationBuilder::new(&lookup, BuilderPolicy::default())
            .build(&input)
            .await;
        let payload = outcome.payload.expect("payload");
        let unit_price = payload.line_items[0].unit_price.as_ref().expect("unit price");
        assert_eq!(unit_price.net_amount, Some(dec("80")));
        assert!(outcome
            .summary
            .warnings
            .iter()
            .any(|warning| warning.message.contains("supplied price ignored")));

        let lookup = MapLookup::new(vec![("srv-1", article)]);
        let policy = BuilderPolicy { honor_supplied_price: true, ..BuilderPolicy::default() };
        let outcome = QuotationBuilder::new(&lookup, policy).build(&input).await;
        let payload = outcome.payload.expect("payload");
        let unit_price = payload.line_items[0].unit_price.as_ref().expect("unit price");
        assert_eq!(unit_price.net_amount, Some(dec("99")));
        assert_eq!(lookup.call_count(), 0);
    }

    #[tokio::test]
    async fn material_rows_always_price_from_the_catalog() {
        let input = workbook(
            &[("taxType", "net")],
            &[("name", "Acme GmbH")],
            ITEM_HEADER,
            &[&["material", "abc-1", "Schraube", "", "10", "Stk", "123"]],
        );
        let lookup = MapLookup::new(vec![(
            "abc-1",
            Article {
                title: None,
                price: Some(ArticlePrice {
                    net_price: Some(dec("1.50")),
                    gross_price: None,
                    tax_rate: Some(dec("19")),
                }),
            },
        )]);
        let policy = BuilderPolicy { honor_supplied_price: true, ..BuilderPolicy::default() };

        let outcome = QuotationBuilder::new(&lookup, policy).build(&input).await;

        let payload = outcome.payload.expect("payload");
        let unit_price = payload.line_items[0].unit_price.as_ref().expect("unit price");
        assert_eq!(unit_price.net_amount, Some(dec("1.50")));
    }

    #[tokio::test]
    async fn service_article_requirement_is_a_policy_decision() {
        let input = workbook(
            &[("taxType", "net")],
            &[("name", "Acme GmbH")],
            ITEM_HEADER,
            &[&["service", "", "Wartung", "", "1", "h", "99"]],
        );
        let lookup = OfflineArticleLookup;

        let lenient =
            QuotationBuilder::new(&lookup, BuilderPolicy::default()).build(&input).await;
        assert!(lenient.payload.is_some());

        let strict_policy =
            BuilderPolicy { service_requires_article: true, ..BuilderPolicy::default() };
        let strict = QuotationBuilder::new(&lookup, strict_policy).build(&input).await;
        assert!(strict.payload.is_none());
        assert!(strict.summary.errors.iter().any(|error| error.field == "articleId"));
    }

    #[tokio::test]
    async fn blank_name_resolves_to_catalog_title_and_is_recorded() {
        let input = workbook(
            &[("taxType", "net")],
            &[("name", "Acme GmbH")],
            ITEM_HEADER,
            &[&["material", "abc-1", "", "", "10", "Stk", ""]],
        );
        let lookup = MapLookup::new(vec![(
            "abc-1",
            Article {
                title: Some("Schraube M4".to_string()),
                price: Some(ArticlePrice {
                    net_price: Some(dec("1.50")),
                    gross_price: None,
                    tax_rate: Some(dec("19")),
                }),
            },
        )]);

        let outcome =
            QuotationBuilder::new(&lookup, BuilderPolicy::default()).build(&input).await;

        let payload = outcome.payload.expect("payload");
        assert_eq!(payload.line_items[0].name, "Schraube M4");
        assert_eq!(outcome.summary.auto_named_line_items.len(), 1);
        assert_eq!(
            outcome.summary.auto_named_line_items[0].article_id.as_deref(),
            Some("abc-1")
        );
        // Title and price came out of one round-trip.
        assert_eq!(lookup.call_count(), 1);
    }

    #[tokio::test]
    async fn unknown_article_falls_back_to_placeholder_name() {
        let input = workbook(
            &[("taxType", "net")],
            &[("name", "Acme GmbH")],
            ITEM_HEADER,
            &[&["custom", "xyz-9", "", "", "1", "Stk", "5"]],
        );
        let lookup = MapLookup::new(vec![]);
        let policy = BuilderPolicy { honor_supplied_price: true, ..BuilderPolicy::default() };

        let outcome = QuotationBuilder::new(&lookup, policy).build(&input).await;

        let payload = outcome.payload.expect("payload");
        assert_eq!(payload.line_items[0].name, "Artikel xyz-9");
        assert_eq!(lookup.call_count(), 1);
    }

    #[tokio::test]
    async fn missing_price_without_article_is_a_hard_row_error() {
        let input = workbook(
            &[("taxType", "net")],
            &[("name", "Acme GmbH")],
            ITEM_HEADER,
            &[&["custom", "", "Beratung", "", "1", "h", ""]],
        );
        let lookup = OfflineArticleLookup;

        let outcome =
            QuotationBuilder::new(&lookup, BuilderPolicy::default()).build(&input).await;

        assert!(outcome.payload.is_none());
        assert_eq!(outcome.summary.errors.len(), 1);
        assert_eq!(outcome.summary.errors[0].field, "unitPriceAmount");
    }

    #[tokio::test]
    async fn incomplete_catalog_price_names_the_article() {
        let input = workbook(
            &[("taxType", "net")],
            &[("name", "Acme GmbH")],
            ITEM_HEADER,
            &[&["material", "abc-1", "Schraube", "", "10", "Stk", ""]],
        );
        let lookup = MapLookup::new(vec![(
            "abc-1",
            Article { title: Some("Schraube M4".to_string()), price: None },
        )]);

        let outcome =
            QuotationBuilder::new(&lookup, BuilderPolicy::default()).build(&input).await;

        assert!(outcome.payload.is_none());
        assert_eq!(outcome.summary.errors.len(), 1);
        let error = &outcome.summary.errors[0];
        assert_eq!(error.field, "unitPriceAmount");
        assert!(error.message.contains("abc-1"));
    }

    #[tokio::test]
    async fn horizontal_metadata_layout_builds_the_same_payload() {
        let mut horizontal = Workbook::new();
        horizontal.insert(
            SHEET_OFFER,
            Sheet::new(strs(&["taxType", "currency"]), vec![strs(&["net", "EUR"])]),
        );
        horizontal.insert(
            SHEET_CUSTOMER,
            Sheet::new(strs(&["Name", "City"]), vec![strs(&["Acme GmbH", "Berlin"])]),
        );
        horizontal.insert(
            SHEET_LINE_ITEMS,
            Sheet::new(strs(ITEM_HEADER), vec![strs(&["custom", "", "Beratung", "", "1", "h", "5"])]),
        );
        let vertical = workbook(
            &[("taxType", "net"), ("currency", "EUR")],
            &[("name", "Acme GmbH"), ("city", "Berlin")],
            ITEM_HEADER,
            &[&["custom", "", "Beratung", "", "1", "h", "5"]],
        );

        let lookup = OfflineArticleLookup;
        let builder = QuotationBuilder::new(&lookup, BuilderPolicy::default());
        let from_horizontal = builder.build(&horizontal).await;
        let from_vertical = builder.build(&vertical).await;

        assert_eq!(from_horizontal, from_vertical);
        assert!(from_horizontal.payload.is_some());
    }

    #[tokio::test]
    async fn alias_columns_qty_unit_price_are_recognized() {
        let mut input = Workbook::new();
        input.insert(SHEET_OFFER, vertical_sheet(&[("taxType", "net")]));
        input.insert(SHEET_CUSTOMER, vertical_sheet(&[("name", "Acme GmbH")]));
        input.insert(
            SHEET_LINE_ITEMS,
            Sheet::new(
                strs(&["type", "name", "qty", "unit", "price", "discount"]),
                vec![strs(&["custom", "Beratung", "2", "h", "50", "10"])],
            ),
        );

        let lookup = OfflineArticleLookup;
        let outcome =
            QuotationBuilder::new(&lookup, BuilderPolicy::default()).build(&input).await;

        let payload = outcome.payload.expect("payload");
        let item = &payload.line_items[0];
        assert_eq!(item.quantity, Some(dec("2")));
        assert_eq!(item.unit_name.as_deref(), Some("h"));
        assert_eq!(item.discount_percentage, Some(dec("10")));
        let unit_price = item.unit_price.as_ref().expect("unit price");
        assert_eq!(unit_price.net_amount, Some(dec("50")));
    }
}
