//! Ordered price-extraction fallback chain. First hit wins; later heuristics
//! only run when everything before them came up empty.
//!
//! Unstructured scans (script text, markup, whole page) enforce the plausible
//! range because they pick up unrelated numbers — shipping costs, sizes, IDs.
//! The structured sources (JSON-LD offer, variant records) are schema
//! constrained and trusted without a range filter.

use regex::Regex;
use scraper::{Html, Selector};

use super::embedded;
use super::Probe;
use crate::types::{ExtractOptions, ScanStrategy};

pub(super) fn extract(
    doc: &Html,
    page: &str,
    opts: &ExtractOptions,
    evidence: &mut Vec<String>,
) -> Option<f64> {
    if let Probe::Found(p) = from_script_currency(doc, opts) {
        evidence.push(format!("price from script currency tag: ${p:.2}"));
        return Some(p);
    }
    if let Probe::Found(p) = from_structured_offer(doc) {
        evidence.push(format!("price from structured offer: ${p:.2}"));
        return Some(p);
    }
    if let Probe::Found(p) = from_variants(doc) {
        evidence.push(format!("price from variant records: ${p:.2}"));
        return Some(p);
    }
    if let Probe::Found(p) = from_markup(doc, opts) {
        evidence.push(format!("price from markup: ${p:.2}"));
        return Some(p);
    }
    if let Probe::Found(p) = from_page_scan(page, opts) {
        evidence.push(format!("price from page scan: ${p:.2}"));
        return Some(p);
    }
    None
}

/// Step 1: currency-tagged amounts inside script text, e.g. `"price":"58 USD"`.
/// Range filtered — scripts carry plenty of unrelated numbers.
pub(super) fn from_script_currency(doc: &Html, opts: &ExtractOptions) -> Probe<f64> {
    let re = Regex::new(r"([0-9]{1,4}(?:\.[0-9]{1,2})?)\s*USD").unwrap();
    let sel = Selector::parse("script").unwrap();

    for script in doc.select(&sel) {
        let text: String = script.text().collect();
        for caps in re.captures_iter(&text) {
            if let Ok(amount) = caps[1].parse::<f64>() {
                if opts.in_range(amount) {
                    return Probe::Found(amount);
                }
            }
        }
    }
    Probe::Absent
}

/// Step 2: JSON-LD product offer. Authoritative — no range filter.
pub(super) fn from_structured_offer(doc: &Html) -> Probe<f64> {
    let product = match embedded::structured_product(doc) {
        Probe::Found(p) => p,
        Probe::Absent => return Probe::Absent,
        Probe::Malformed => return Probe::Malformed,
    };
    let price = embedded::product_offer(&product)
        .and_then(|offer| offer.get("price"))
        .and_then(embedded::numeric);
    match price {
        Some(p) => Probe::Found(p),
        None => Probe::Absent,
    }
}

/// Step 3: lowest price across available embedded variants. No range filter.
pub(super) fn from_variants(doc: &Html) -> Probe<f64> {
    let variants = match embedded::variant_records(doc) {
        Probe::Found(v) => v,
        Probe::Absent => return Probe::Absent,
        Probe::Malformed => return Probe::Malformed,
    };
    let lowest = variants
        .iter()
        .filter(|v| v.available)
        .filter_map(|v| v.price)
        .fold(None::<f64>, |acc, p| {
            Some(acc.map_or(p, |best| best.min(p)))
        });
    match lowest {
        Some(p) => Probe::Found(p),
        None => Probe::Absent,
    }
}

/// Step 4: rendered-markup price elements and price meta tags. Range filtered.
pub(super) fn from_markup(doc: &Html, opts: &ExtractOptions) -> Probe<f64> {
    let amount_re = Regex::new(r"([0-9]{1,3}(?:,[0-9]{3})*(?:\.[0-9]{2})?)").unwrap();

    let testid = Selector::parse(r#"[data-testid="price"]"#).unwrap();
    for el in doc.select(&testid) {
        let text: String = el.text().collect();
        if let Some(p) = parse_amount(&amount_re, &text) {
            if opts.in_range(p) {
                return Probe::Found(p);
            }
        }
    }

    // Class-substring match, case-insensitive, across the usual price carriers.
    let carriers = Selector::parse("span, div, p").unwrap();
    for el in doc.select(&carriers) {
        let has_price_class = el
            .value()
            .classes()
            .any(|c| c.to_lowercase().contains("price"));
        if !has_price_class {
            continue;
        }
        let text: String = el.text().collect();
        if let Some(p) = parse_amount(&amount_re, &text) {
            if opts.in_range(p) {
                return Probe::Found(p);
            }
        }
    }

    let metas = [
        Selector::parse(r#"meta[property="product:price:amount"]"#).unwrap(),
        Selector::parse(r#"meta[name="price"]"#).unwrap(),
        Selector::parse(r#"meta[property="og:price:amount"]"#).unwrap(),
    ];
    for sel in &metas {
        for el in doc.select(sel) {
            let content = el.value().attr("content").unwrap_or("");
            if let Some(p) = parse_amount(&amount_re, content) {
                if opts.in_range(p) {
                    return Probe::Found(p);
                }
            }
        }
    }

    Probe::Absent
}

/// Step 5, last resort: any `$<amount>` anywhere in the page text. Only
/// in-range matches count; the scan strategy picks the first or the lowest.
pub(super) fn from_page_scan(page: &str, opts: &ExtractOptions) -> Probe<f64> {
    let re = Regex::new(r"\$\s*([0-9]{1,3}(?:,[0-9]{3})*(?:\.[0-9]{2})?)").unwrap();

    let mut chosen: Option<f64> = None;
    for caps in re.captures_iter(page) {
        let Ok(amount) = caps[1].replace(',', "").parse::<f64>() else {
            continue;
        };
        if !opts.in_range(amount) {
            continue;
        }
        match opts.scan_strategy {
            ScanStrategy::First => return Probe::Found(amount),
            ScanStrategy::Lowest => {
                chosen = Some(chosen.map_or(amount, |best: f64| best.min(amount)));
            }
        }
    }

    match chosen {
        Some(p) => Probe::Found(p),
        None => Probe::Absent,
    }
}

fn parse_amount(re: &Regex, text: &str) -> Option<f64> {
    let caps = re.captures(text)?;
    caps[1].replace(',', "").parse().ok()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StockPolicy;

    fn opts() -> ExtractOptions {
        ExtractOptions {
            plausible_min: 20.0,
            plausible_max: 300.0,
            stock_policy: StockPolicy::ExplicitMarkers,
            scan_strategy: ScanStrategy::First,
        }
    }

    fn doc(html: &str) -> Html {
        Html::parse_document(html)
    }

    #[test]
    fn script_currency_tag_within_range() {
        let d = doc(r#"<script>var p = {"display":"88.00 USD"};</script>"#);
        assert_eq!(from_script_currency(&d, &opts()), Probe::Found(88.0));
    }

    #[test]
    fn script_currency_tag_rejects_out_of_range() {
        // 5 USD (shipping) and 9999 USD (an id) are both outside 20-300.
        let d = doc(r#"<script>ship = "5 USD"; sku = "9999 USD";</script>"#);
        assert_eq!(from_script_currency(&d, &opts()), Probe::Absent);
    }

    #[test]
    fn structured_offer_is_trusted_without_range_filter() {
        let d = doc(
            r#"<script type="application/ld+json">
               {"@type":"Product","offers":{"price":"9.00"}}</script>"#,
        );
        assert_eq!(from_structured_offer(&d), Probe::Found(9.0));
    }

    #[test]
    fn structured_offer_malformed_json() {
        let d = doc(r#"<script type="application/ld+json">{oops</script>"#);
        assert_eq!(from_structured_offer(&d), Probe::Malformed);
    }

    #[test]
    fn variants_prefer_lowest_available_price() {
        let d = doc(
            r#"<script>window.productData = {"variants":[
               {"available":true,"price":58},
               {"available":true,"price":44},
               {"available":false,"price":12}]};</script>"#,
        );
        assert_eq!(from_variants(&d), Probe::Found(44.0));
    }

    #[test]
    fn variants_with_none_available_are_absent() {
        let d = doc(r#"<script>window.productData = {"variants":[{"available":false,"price":44}]};</script>"#);
        assert_eq!(from_variants(&d), Probe::Absent);
    }

    #[test]
    fn markup_testid_price() {
        let d = doc(r#"<span data-testid="price">$128.00</span>"#);
        assert_eq!(from_markup(&d, &opts()), Probe::Found(128.0));
    }

    #[test]
    fn markup_class_substring_price() {
        let d = doc(r#"<div class="pdp-Price-current">$64.00</div>"#);
        assert_eq!(from_markup(&d, &opts()), Probe::Found(64.0));
    }

    #[test]
    fn markup_meta_tag_price() {
        let d = doc(r#"<meta property="product:price:amount" content="72.00">"#);
        assert_eq!(from_markup(&d, &opts()), Probe::Found(72.0));
    }

    #[test]
    fn markup_out_of_range_is_skipped() {
        let d = doc(r#"<span class="price">$5.00</span>"#);
        assert_eq!(from_markup(&d, &opts()), Probe::Absent);
    }

    #[test]
    fn page_scan_first_match() {
        assert_eq!(
            from_page_scan("was $98.00 now $48.00", &opts()),
            Probe::Found(98.0)
        );
    }

    #[test]
    fn page_scan_lowest_match() {
        let lowest = ExtractOptions {
            scan_strategy: ScanStrategy::Lowest,
            ..opts()
        };
        assert_eq!(
            from_page_scan("was $98.00 now $48.00", &lowest),
            Probe::Found(48.0)
        );
    }

    #[test]
    fn page_scan_ignores_out_of_range_noise() {
        assert_eq!(
            from_page_scan("shipping $5, warranty $999", &opts()),
            Probe::Absent
        );
    }

    #[test]
    fn structured_offer_beats_out_of_range_scan_noise() {
        // Page carries $5 and $999 noise, plus an authoritative offer price.
        let html = r#"<html><head>
            <script type="application/ld+json">{"@type":"Product","offers":{"price":58}}</script>
            </head><body>shipping $5 ... warranty $999</body></html>"#;
        let d = doc(html);
        let mut evidence = Vec::new();
        let price = extract(&d, html, &opts(), &mut evidence);
        assert_eq!(price, Some(58.0));
        assert!(evidence.iter().any(|e| e.contains("structured offer")));
    }

    #[test]
    fn chain_falls_all_the_way_to_page_scan() {
        let html = "<html><body>now only $42.00</body></html>";
        let d = doc(html);
        let mut evidence = Vec::new();
        assert_eq!(extract(&d, html, &opts(), &mut evidence), Some(42.0));
        assert!(evidence.iter().any(|e| e.contains("page scan")));
    }
}
