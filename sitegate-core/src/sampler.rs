// Stratified URL sampling by path depth

use std::collections::BTreeMap;
use url::Url;

/// Number of non-empty `/` segments in the URL path. Unparseable URLs count
/// as depth 0.
pub fn path_depth(url: &str) -> usize {
    Url::parse(url)
        .map(|u| u.path().split('/').filter(|s| !s.is_empty()).count())
        .unwrap_or(0)
}

/// Pick at most `count` URLs spread evenly across path depths.
///
/// Each depth gets an equal share of the budget, and within a depth URLs are
/// taken at a fixed stride so the pick covers the whole stratum. Depths are
/// visited shallowest first. The result is deterministic for a given input.
pub fn sample_pages(urls: &[String], count: usize) -> Vec<String> {
    if count == 0 {
        return Vec::new();
    }
    if urls.len() <= count {
        return urls.to_vec();
    }

    let mut strata: BTreeMap<usize, Vec<&String>> = BTreeMap::new();
    for url in urls {
        strata.entry(path_depth(url)).or_default().push(url);
    }

    let per_depth = count.div_ceil(strata.len());
    let mut sampled = Vec::with_capacity(count);

    'strata: for stratum in strata.values() {
        let stride = stratum.len().div_ceil(per_depth).max(1);
        for url in stratum.iter().step_by(stride) {
            if sampled.len() >= count {
                break 'strata;
            }
            sampled.push((*url).clone());
        }
    }

    sampled.truncate(count);
    sampled
}
