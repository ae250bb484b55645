//! Selection, crossover and mutation.

use planforge_core::Result;
use rand::Rng;

use crate::genome::Gene;
use crate::problem::AllocationProblem;

/// Largest start-offset shift applied by one mutation, in days.
const MAX_OFFSET_SHIFT: i64 = 3;

/// Picks `size` random contestants and returns the fittest index.
/// Ties go to the lower index.
pub fn tournament<R: Rng>(fitness: &[f64], size: usize, rng: &mut R) -> usize {
    let mut winner = rng.random_range(0..fitness.len());
    for _ in 1..size.max(1) {
        let challenger = rng.random_range(0..fitness.len());
        let better = fitness[challenger] > fitness[winner]
            || (fitness[challenger] == fitness[winner] && challenger < winner);
        if better {
            winner = challenger;
        }
    }
    winner
}

/// Swaps the tails of two genomes after a random cut point.
///
/// Both parents are valid at every position, so the children need no
/// repair.
pub fn single_point_crossover<R: Rng>(a: &mut [Gene], b: &mut [Gene], rng: &mut R) {
    let len = a.len().min(b.len());
    if len < 2 {
        return;
    }
    let point = rng.random_range(1..len);
    a[point..len].swap_with_slice(&mut b[point..len]);
}

/// Mutates each gene with probability `rate`: reassigns its resource,
/// shifts its start offset, or both. Mutated genes are repaired at once.
///
/// # Errors
///
/// `ConstraintInfeasible` if a gene cannot be repaired.
pub fn mutate<R: Rng>(
    problem: &AllocationProblem,
    genes: &mut [Gene],
    rate: f64,
    rng: &mut R,
) -> Result<()> {
    for (task, gene) in genes.iter_mut().enumerate() {
        if !rng.random_bool(rate) {
            continue;
        }
        let mut mutated = *gene;
        let kind = rng.random_range(0..3);
        if kind != 1 {
            mutated.resource = rng.random_range(0..problem.resource_count()) as u16;
        }
        if kind != 0 {
            let shift = rng.random_range(-MAX_OFFSET_SHIFT..=MAX_OFFSET_SHIFT);
            mutated.start_offset = (mutated.start_offset as i64 + shift).max(0) as u32;
        }
        *gene = problem.repair(task, mutated, rng)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use planforge_test::project_request;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn test_tournament_prefers_fitter() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let fitness = [0.1, 0.9, 0.2, 0.3];
        // With the whole population sampled many times the best wins.
        let wins = (0..200)
            .filter(|_| tournament(&fitness, 8, &mut rng) == 1)
            .count();
        assert!(wins > 150, "wins {wins}");
    }

    #[test]
    fn test_crossover_keeps_length_and_genes() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let mut a: Vec<Gene> = (0..6).map(|i| Gene::new(0, i)).collect();
        let mut b: Vec<Gene> = (0..6).map(|i| Gene::new(1, i)).collect();
        single_point_crossover(&mut a, &mut b, &mut rng);
        assert_eq!(a.len(), 6);
        assert_eq!(a[0].resource, 0);
        assert_eq!(b[0].resource, 1);
        assert_eq!(a[5].resource, 1);
        for (i, (x, y)) in a.iter().zip(&b).enumerate() {
            assert_eq!(x.start_offset, i as u32);
            assert_eq!(y.start_offset, i as u32);
        }
    }

    #[test]
    fn test_mutation_keeps_genes_eligible() {
        let problem = AllocationProblem::new(&project_request(9, 6)).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut genes: Vec<Gene> = (0..9)
            .map(|t| problem.random_gene(t, &mut rng).unwrap())
            .collect();
        for _ in 0..50 {
            mutate(&problem, &mut genes, 1.0, &mut rng).unwrap();
            for (t, g) in genes.iter().enumerate() {
                assert!(problem.is_eligible(t, g.resource));
                assert!(g.start_offset < problem.horizon_days());
            }
        }
    }
}
