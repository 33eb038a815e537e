use super::discover::CategoryCandidate;
use super::entries::ItemRef;
use super::scan::scan_category;
use crate::clients::http::MallClient;
use crate::config::RankingConfig;
use tracing::info;

/// One located rank: the target's position in one category's leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankFinding {
    pub rank: u32,
    pub category_name: String,
    pub category_id_len: usize,
}

/// The externally visible pair of ranks. The minor rank belongs to the most
/// specific category (longest category id), the major to a broader one.
/// Empty strings mean unresolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RankResult {
    pub major_rank: String,
    pub minor_rank: String,
}

fn format_rank(finding: &RankFinding) -> String {
    format!("{} 第{}", finding.category_name, finding.rank)
}

/// Picks the minor/major rank pair from all findings for one product.
///
/// Findings are sorted by descending category-id length (longer ids are more
/// specific categories), ties broken by smaller rank. The first entry is the
/// minor rank. The major rank is the first remaining finding whose category
/// name differs from the minor's; when every name matches, the second finding
/// is taken anyway.
pub fn select_ranks(mut findings: Vec<RankFinding>) -> RankResult {
    let mut result = RankResult::default();
    if findings.is_empty() {
        return result;
    }

    findings.sort_by(|a, b| {
        b.category_id_len
            .cmp(&a.category_id_len)
            .then(a.rank.cmp(&b.rank))
    });

    let minor = &findings[0];
    result.minor_rank = format_rank(minor);

    if findings.len() > 1 {
        let major = findings[1..]
            .iter()
            .find(|f| f.category_name != minor.category_name)
            .unwrap_or(&findings[1]);
        result.major_rank = format_rank(major);
    }

    result
}

/// Scans every discovered category's leaderboards for the target item and
/// reduces the findings to a major/minor rank pair.
pub async fn rank_in_categories(
    client: &MallClient,
    target: &ItemRef,
    candidates: &[CategoryCandidate],
    config: &RankingConfig,
) -> RankResult {
    // Dedup candidates by id, first occurrence wins.
    let mut unique: Vec<&CategoryCandidate> = Vec::new();
    for candidate in candidates {
        if !unique.iter().any(|c| c.id == candidate.id) {
            unique.push(candidate);
        }
    }

    info!("Scanning {} categories for rank", unique.len());
    let mut findings = Vec::new();

    for candidate in unique {
        for rank_type in &config.rank_types {
            let Some(hit) =
                scan_category(client, target, &candidate.id, rank_type, config.search_pages).await
            else {
                continue;
            };

            // Prefer the leaderboard's own title over the discovered name.
            let name = hit
                .category_name
                .or_else(|| candidate.name.clone())
                .unwrap_or_else(|| format!("カテゴリ{}", candidate.id));

            info!("Rank {} in {} (id {})", hit.rank, name, candidate.id);
            findings.push(RankFinding {
                rank: hit.rank,
                category_name: name,
                category_id_len: candidate.id.len(),
            });
        }
    }

    let result = select_ranks(findings);
    if result.minor_rank.is_empty() {
        info!("Target not present on any scanned leaderboard");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding(rank: u32, name: &str, id_len: usize) -> RankFinding {
        RankFinding {
            rank,
            category_name: name.to_string(),
            category_id_len: id_len,
        }
    }

    #[test]
    fn longest_id_then_smallest_rank_wins_minor() {
        let result = select_ranks(vec![
            finding(5, "A", 6),
            finding(2, "A", 8),
            finding(10, "B", 8),
        ]);

        assert_eq!(result.minor_rank, "A 第2");
        assert_eq!(result.major_rank, "B 第10");
    }

    #[test]
    fn major_falls_back_to_second_when_all_names_match() {
        let result = select_ranks(vec![finding(3, "A", 8), finding(9, "A", 6)]);

        assert_eq!(result.minor_rank, "A 第3");
        assert_eq!(result.major_rank, "A 第9");
    }

    #[test]
    fn no_findings_yield_empty_result() {
        assert_eq!(select_ranks(vec![]), RankResult::default());
    }

    #[test]
    fn single_finding_leaves_major_empty() {
        let result = select_ranks(vec![finding(1, "A", 6)]);

        assert_eq!(result.minor_rank, "A 第1");
        assert_eq!(result.major_rank, "");
    }
}
