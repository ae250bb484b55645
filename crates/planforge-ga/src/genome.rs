//! Genes and the double-buffered population arena.

use serde::{Deserialize, Serialize};

/// Assignment of one task: a resource index into the pool and the
/// earliest start day the task may take.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Gene {
    pub resource: u16,
    pub start_offset: u32,
}

impl Gene {
    pub fn new(resource: u16, start_offset: u32) -> Self {
        Self {
            resource,
            start_offset,
        }
    }
}

/// Fraction of positions at which two genomes differ.
pub fn hamming_distance(a: &[Gene], b: &[Gene]) -> f64 {
    let len = a.len().max(b.len());
    if len == 0 {
        return 0.0;
    }
    let same = a.iter().zip(b).filter(|(x, y)| x == y).count();
    (len - same) as f64 / len as f64
}

/// Fixed-size population stored as one flat gene arena per generation.
///
/// Genome `i` occupies `genes[i * genome_len..(i + 1) * genome_len]`. The
/// next generation is written into a second arena and the two are swapped,
/// so the current generation is never mutated while it is evaluated.
#[derive(Debug, Clone)]
pub struct Population {
    size: usize,
    genome_len: usize,
    current: Vec<Gene>,
    next: Vec<Gene>,
}

impl Population {
    pub fn new(size: usize, genome_len: usize) -> Self {
        Self {
            size,
            genome_len,
            current: vec![Gene::default(); size * genome_len],
            next: vec![Gene::default(); size * genome_len],
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn genome_len(&self) -> usize {
        self.genome_len
    }

    fn span(&self, i: usize) -> std::ops::Range<usize> {
        i * self.genome_len..(i + 1) * self.genome_len
    }

    pub fn genome(&self, i: usize) -> &[Gene] {
        &self.current[self.span(i)]
    }

    pub fn genome_mut(&mut self, i: usize) -> &mut [Gene] {
        let span = self.span(i);
        &mut self.current[span]
    }

    /// All genomes of the current generation, in order.
    pub fn genomes(&self) -> impl Iterator<Item = &[Gene]> {
        self.current.chunks_exact(self.genome_len)
    }

    pub fn genes(&self) -> &[Gene] {
        &self.current
    }

    /// Genes of the next generation starting at genome `from`.
    pub fn next_genes_from(&self, from: usize) -> &[Gene] {
        &self.next[from * self.genome_len..]
    }

    pub fn next_mut(&mut self, slot: usize) -> &mut [Gene] {
        let span = self.span(slot);
        &mut self.next[span]
    }

    /// Two distinct next-generation slots, `a < b`.
    pub fn next_pair_mut(&mut self, a: usize, b: usize) -> (&mut [Gene], &mut [Gene]) {
        debug_assert!(a < b && b < self.size);
        let len = self.genome_len;
        let (lo, hi) = self.next.split_at_mut(b * len);
        (&mut lo[a * len..(a + 1) * len], &mut hi[..len])
    }

    /// Copies current genome `from` into next slot `slot`.
    pub fn copy_to_next(&mut self, from: usize, slot: usize) {
        let src = self.span(from);
        let dst = slot * self.genome_len;
        self.next[dst..dst + self.genome_len].copy_from_slice(&self.current[src]);
    }

    /// Makes the next generation current.
    pub fn advance(&mut self) {
        std::mem::swap(&mut self.current, &mut self.next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hamming_distance() {
        let a = [Gene::new(0, 0), Gene::new(1, 2), Gene::new(2, 0)];
        let b = [Gene::new(0, 0), Gene::new(1, 3), Gene::new(1, 0)];
        assert!((hamming_distance(&a, &b) - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(hamming_distance(&a, &a), 0.0);
    }

    #[test]
    fn test_ping_pong_buffers() {
        let mut pop = Population::new(3, 2);
        pop.genome_mut(1)[0] = Gene::new(4, 1);
        pop.copy_to_next(1, 0);
        {
            let (a, b) = pop.next_pair_mut(0, 2);
            b.copy_from_slice(a);
            b[1] = Gene::new(2, 2);
        }
        // Current generation is untouched until the swap.
        assert_eq!(pop.genome(0)[0], Gene::default());

        pop.advance();
        assert_eq!(pop.genome(0)[0], Gene::new(4, 1));
        assert_eq!(pop.genome(2), &[Gene::new(4, 1), Gene::new(2, 2)]);
        assert_eq!(pop.genomes().count(), 3);
    }
}
