use crate::config::{FpPrecision, SIGMA_T_THRESH};

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn consistent_cross_sections() {
        let material = Material::new(
            1,
            vec![0.5, 1.0],
            vec![0.2, 0.8],
            vec![0.25, 0.05, 0.0, 0.2],
            vec![0.1, 0.3],
            vec![0.25, 0.75],
            vec![1.0, 0.0],
        );
        assert_eq!(material.num_energy_groups(), 2);
        material.check_sigma_t();
    }

    #[test]
    #[should_panic(expected = "inconsistent")]
    fn inconsistent_cross_sections() {
        let material = Material::new(
            1,
            vec![0.5, 1.0],
            vec![0.2, 0.8],
            vec![0.1, 0.05, 0.0, 0.2],
            vec![0.1, 0.3],
            vec![0.25, 0.75],
            vec![1.0, 0.0],
        );
        material.check_sigma_t();
    }

    #[test]
    #[should_panic(expected = "entries")]
    fn mismatched_group_structure() {
        let _ = Material::new(
            1,
            vec![0.5, 1.0],
            vec![0.2],
            vec![0.25, 0.05, 0.0, 0.2],
            vec![0.1, 0.3],
            vec![0.25, 0.75],
            vec![1.0, 0.0],
        );
    }
}

/// Multigroup nuclear data for one material. The geometry only consumes the id,
/// the group count, and the total cross section consistency check; the rest of
/// the data rides along for the solver.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub id: i32,
    num_groups: usize,
    sigma_t: Vec<FpPrecision>,
    sigma_a: Vec<FpPrecision>,
    sigma_s: Vec<FpPrecision>, // group-to-group scattering, row-major [g * num_groups + g']
    sigma_f: Vec<FpPrecision>,
    nu_sigma_f: Vec<FpPrecision>,
    chi: Vec<FpPrecision>,
}

impl Material {
    pub fn new(
        id: i32,
        sigma_t: Vec<FpPrecision>,
        sigma_a: Vec<FpPrecision>,
        sigma_s: Vec<FpPrecision>,
        sigma_f: Vec<FpPrecision>,
        nu_sigma_f: Vec<FpPrecision>,
        chi: Vec<FpPrecision>,
    ) -> Self {
        let num_groups = sigma_t.len();
        for (name, data) in [
            ("sigma_a", &sigma_a),
            ("sigma_f", &sigma_f),
            ("nu_sigma_f", &nu_sigma_f),
            ("chi", &chi),
        ] {
            if data.len() != num_groups {
                panic!(
                    "material {}: {} has {} entries but sigma_t has {}",
                    id,
                    name,
                    data.len(),
                    num_groups
                );
            }
        }
        if sigma_s.len() != num_groups * num_groups {
            panic!(
                "material {}: sigma_s has {} entries but {} groups need {}",
                id,
                sigma_s.len(),
                num_groups,
                num_groups * num_groups
            );
        }

        Self {
            id,
            num_groups,
            sigma_t,
            sigma_a,
            sigma_s,
            sigma_f,
            nu_sigma_f,
            chi,
        }
    }

    pub fn num_energy_groups(&self) -> usize {
        self.num_groups
    }

    pub fn sigma_t(&self) -> &[FpPrecision] {
        &self.sigma_t
    }

    pub fn sigma_a(&self) -> &[FpPrecision] {
        &self.sigma_a
    }

    /// Scattering cross section from group `g` into group `g_prime`.
    pub fn sigma_s(&self, g: usize, g_prime: usize) -> FpPrecision {
        self.sigma_s[g * self.num_groups + g_prime]
    }

    pub fn sigma_f(&self) -> &[FpPrecision] {
        &self.sigma_f
    }

    pub fn nu_sigma_f(&self) -> &[FpPrecision] {
        &self.nu_sigma_f
    }

    pub fn chi(&self) -> &[FpPrecision] {
        &self.chi
    }

    /// Verifies that in every group the absorption plus outscattering cross
    /// sections add up to the total cross section.
    pub fn check_sigma_t(&self) {
        for g in 0..self.num_groups {
            let scattering: FpPrecision = (0..self.num_groups).map(|gp| self.sigma_s(g, gp)).sum();
            let total = self.sigma_a[g] + scattering;
            if (total - self.sigma_t[g]).abs() > SIGMA_T_THRESH as FpPrecision {
                panic!(
                    "material {} has inconsistent cross sections in group {}: \
                     sigma_a + sigma_s = {} but sigma_t = {}",
                    self.id, g, total, self.sigma_t[g]
                );
            }
        }
    }
}
