use rand::seq::SliceRandom;
use rand::Rng;

use crate::instance::Instance;

pub fn batch_count(len: usize, batch_size: usize) -> usize {
    if batch_size == 0 {
        return 0;
    }
    (len + batch_size - 1) / batch_size
}

/// Splits `data` into batches of `batch_size`; the last one may be shorter.
/// When a `shuffle` rng is given the instances are permuted first.
pub fn data_iter<'a, R: Rng + ?Sized>(
    data: &'a [Instance],
    batch_size: usize,
    shuffle: Option<&mut R>,
) -> Vec<Vec<&'a Instance>> {
    let batch_size = batch_size.max(1);
    let mut order: Vec<usize> = (0..data.len()).collect();
    if let Some(rng) = shuffle {
        order.shuffle(rng);
    }

    order
        .chunks(batch_size)
        .map(|idx| idx.iter().map(|&i| &data[i]).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn data(n: usize) -> Vec<Instance> {
        (0..n)
            .map(|i| Instance::new(format!("blk_{}", i), vec![], "Normal"))
            .collect()
    }

    #[test]
    fn counts_partial_batches() {
        assert_eq!(batch_count(10, 4), 3);
        assert_eq!(batch_count(8, 4), 2);
        assert_eq!(batch_count(0, 4), 0);
    }

    #[test]
    fn unshuffled_batches_keep_order() {
        let data = data(5);
        let batches = data_iter(&data, 2, None::<&mut StdRng>);
        let ids: Vec<Vec<&str>> = batches
            .iter()
            .map(|b| b.iter().map(|i| i.id.as_str()).collect())
            .collect();
        assert_eq!(
            ids,
            vec![vec!["blk_0", "blk_1"], vec!["blk_2", "blk_3"], vec!["blk_4"]]
        );
    }

    #[test]
    fn shuffled_batches_cover_every_instance_once() {
        let data = data(17);
        let mut rng = StdRng::seed_from_u64(7);
        let batches = data_iter(&data, 4, Some(&mut rng));
        assert_eq!(batches.len(), batch_count(17, 4));

        let mut ids: Vec<&str> = batches.iter().flatten().map(|i| i.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 17);
    }

    #[test]
    fn same_seed_gives_same_order() {
        let data = data(9);
        let order = |seed| -> Vec<String> {
            let mut rng = StdRng::seed_from_u64(seed);
            data_iter(&data, 2, Some(&mut rng))
                .into_iter()
                .flatten()
                .map(|i| i.id.clone())
                .collect()
        };
        assert_eq!(order(3), order(3));
    }
}
