use crate::model::StatsMapping;

/// Sum contributor entries across inputs. Each input's own `total` is
/// ignored and rebuilt from the summed contributors.
pub fn aggregate<'a, I>(results: I) -> StatsMapping
where
    I: IntoIterator<Item = &'a StatsMapping>,
{
    let mut agg = StatsMapping::new();
    for mapping in results {
        for (contributor, stats) in &mapping.contributors {
            agg.add(contributor.clone(), stats);
        }
    }
    agg
}
