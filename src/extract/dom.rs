//! Pattern B: result blocks picked out of the rendered DOM.

use hashbrown::HashSet;
use scraper::{ElementRef, Html, Selector};
use serde_json::json;

use super::{Candidate, match_section};
use crate::catalog::Catalog;

pub const BLOCK_SELECTORS: &str =
    r#"[class*="result"], [class*="lotto"], [class*="huay"], table"#;

pub struct DomExtractor<'c> {
    catalog: &'c Catalog,
    sel_block: Selector,
}

fn block_text(element: ElementRef) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl<'c> DomExtractor<'c> {
    pub fn new(catalog: &'c Catalog) -> anyhow::Result<Self> {
        Ok(Self {
            catalog,
            sel_block: Selector::parse(BLOCK_SELECTORS)
                .map_err(|e| anyhow::anyhow!("selector error: {e:?}"))?,
        })
    }

    /// Each matching element is one section. Containers naming more than one
    /// lottery are skipped so their inner blocks are read on their own.
    pub fn extract(&self, html: &str) -> Vec<Candidate> {
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();

        document
            .select(&self.sel_block)
            .map(block_text)
            .filter(|text| self.catalog.detect_count(text) == 1)
            .filter_map(|text| match_section(&text, self.catalog))
            .filter(|draw| seen.insert(draw.lottery_type))
            .map(|draw| {
                Candidate::Loose(json!({
                    "lottery_type": draw.lottery_type,
                    "lottery_name": draw.lottery_type.name(),
                    "draw_date_source_text": draw.date_text,
                    "results": draw.numbers,
                }))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::LotteryType;

    const PAGE: &str = r#"
        <html><body>
          <div class="results-wrap">
            <div class="lotto-card">
              <h3>หวยออมสิน</h3>
              <p>งวดวันที่ 16 มกราคม 2568</p>
              <span>ผลรางวัล</span> <b>012345</b>
            </div>
            <div class="lotto-card">
              <h3>หวย ธ.ก.ส.</h3>
              <p>3 ตัวบน</p><b>908</b>
              <p>2 ตัวล่าง</p><b>07</b>
            </div>
            <div class="lotto-card">
              <h3>หวยออมสิน (ย้อนหลัง)</h3>
              <span>ผลรางวัล</span> <b>999999</b>
            </div>
          </div>
        </body></html>
    "#;

    #[test]
    fn cards_become_loose_candidates() {
        let catalog = Catalog::builtin().unwrap();
        let candidates = DomExtractor::new(&catalog).unwrap().extract(PAGE);
        assert_eq!(candidates.len(), 2);

        let Candidate::Loose(gsb) = &candidates[0] else { panic!() };
        assert_eq!(gsb["lottery_type"], LotteryType::Gsb.key());
        assert_eq!(gsb["results"]["full_number"], "012345");
        assert_eq!(gsb["draw_date_source_text"], "16 มกราคม 2568");

        let Candidate::Loose(baac) = &candidates[1] else { panic!() };
        assert_eq!(baac["results"]["top3"], "908");
        assert_eq!(baac["results"]["bottom2"], "07");
    }
}
