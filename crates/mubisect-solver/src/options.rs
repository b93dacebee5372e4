/// Width of a packed string option row.
pub const STR_OPT_WIDTH: usize = 72;
/// Width of a packed integer or real option name row.
pub const NUM_OPT_WIDTH: usize = 55;

/// A named option set for one backend call.
///
/// Integer and real options keep their insertion order; setting an
/// existing name overwrites its value in place, so callers can tune a
/// profile without disturbing the layout the backend sees.
#[derive(Debug, Clone, PartialEq)]
pub struct SolverOptions {
    pub strings: Vec<String>,
    pub ints: Vec<(String, i32)>,
    pub reals: Vec<(String, f64)>,
}

impl SolverOptions {
    /// The extended-precision LP profile.
    pub fn quad() -> Self {
        Self {
            strings: vec!["Maximize".to_string(), "Solution No".to_string()],
            ints: Self::shared_ints(),
            reals: vec![
                ("Penalty parameter".to_string(), 100.0),
                ("LU factor tol".to_string(), 10.0),
                ("LU update tol".to_string(), 10.0),
                ("LU singularity tol".to_string(), 1e-30),
                ("Feasibility tol".to_string(), 1e-20),
                ("Optimality tol".to_string(), 1e-20),
                ("Unbounded step size".to_string(), 1e+30),
            ],
        }
    }

    /// The standard-precision LP profile.
    pub fn double() -> Self {
        Self {
            strings: vec!["Maximize".to_string(), "Solution No".to_string()],
            ints: Self::shared_ints(),
            reals: vec![
                ("Penalty parameter".to_string(), 100.0),
                ("LU factor tol".to_string(), 1.9),
                ("LU update tol".to_string(), 1.9),
                ("LU singularity tol".to_string(), 1e-12),
                ("Feasibility tol".to_string(), 1e-7),
                ("Optimality tol".to_string(), 1e-7),
                ("Unbounded step size".to_string(), 1e+18),
            ],
        }
    }

    fn shared_ints() -> Vec<(String, i32)> {
        vec![
            ("New basis file".to_string(), 11),
            ("Save frequency".to_string(), 500000),
            ("Print level".to_string(), 0),
            ("Print frequency".to_string(), 100000),
            ("Scale option".to_string(), 2),
            ("Iteration limit".to_string(), 2000000),
            ("Expand frequency".to_string(), 100000),
        ]
    }

    pub fn set_int(&mut self, name: &str, value: i32) {
        match self.ints.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.ints.push((name.to_string(), value)),
        }
    }

    pub fn set_real(&mut self, name: &str, value: f64) {
        match self.reals.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value,
            None => self.reals.push((name.to_string(), value)),
        }
    }

    pub fn int(&self, name: &str) -> Option<i32> {
        self.ints.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    pub fn real(&self, name: &str) -> Option<f64> {
        self.reals.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    pub fn has_string(&self, name: &str) -> bool {
        self.strings.iter().any(|s| s == name)
    }

    /// Lay the options out as the backend expects them: left-justified
    /// space-padded byte rows with parallel value arrays.
    pub fn pack(&self) -> PackedOptions {
        PackedOptions {
            stropts: self.strings.iter().map(|s| ljust(s, STR_OPT_WIDTH)).collect(),
            intopts: self
                .ints
                .iter()
                .map(|(n, _)| ljust(n, NUM_OPT_WIDTH))
                .collect(),
            intvals: self.ints.iter().map(|(_, v)| *v).collect(),
            realopts: self
                .reals
                .iter()
                .map(|(n, _)| ljust(n, NUM_OPT_WIDTH))
                .collect(),
            realvals: self.reals.iter().map(|(_, v)| *v).collect(),
        }
    }
}

/// Option arrays in the backend's calling convention.
#[derive(Debug, Clone, PartialEq)]
pub struct PackedOptions {
    pub stropts: Vec<Vec<u8>>,
    pub intopts: Vec<Vec<u8>>,
    pub intvals: Vec<i32>,
    pub realopts: Vec<Vec<u8>>,
    pub realvals: Vec<f64>,
}

fn ljust(name: &str, width: usize) -> Vec<u8> {
    debug_assert!(name.len() <= width, "option name `{name}` exceeds {width}");
    let mut row = Vec::with_capacity(width);
    row.extend_from_slice(name.as_bytes());
    row.resize(width, b' ');
    row
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_values() {
        let quad = SolverOptions::quad();
        assert_eq!(quad.int("Scale option"), Some(2));
        assert_eq!(quad.int("Iteration limit"), Some(2000000));
        assert_eq!(quad.real("Feasibility tol"), Some(1e-20));
        assert_eq!(quad.real("LU singularity tol"), Some(1e-30));
        assert_eq!(quad.real("LU factor tol"), Some(10.0));
        assert_eq!(quad.real("LU update tol"), Some(10.0));
        assert!(quad.has_string("Maximize"));

        let double = SolverOptions::double();
        assert_eq!(double.real("Feasibility tol"), Some(1e-7));
        assert_eq!(double.real("LU factor tol"), Some(1.9));
        assert_eq!(double.real("Unbounded step size"), Some(1e+18));
        assert_eq!(double.ints, quad.ints);
    }

    #[test]
    fn test_packed_widths() {
        let packed = SolverOptions::quad().pack();
        assert!(packed.stropts.iter().all(|row| row.len() == STR_OPT_WIDTH));
        assert!(packed.intopts.iter().all(|row| row.len() == NUM_OPT_WIDTH));
        assert!(packed.realopts.iter().all(|row| row.len() == NUM_OPT_WIDTH));
        assert_eq!(packed.intopts.len(), packed.intvals.len());
        assert_eq!(packed.realopts.len(), packed.realvals.len());
    }

    #[test]
    fn test_packed_names_trim_back() {
        let packed = SolverOptions::quad().pack();
        let first = std::str::from_utf8(&packed.intopts[0]).unwrap();
        assert_eq!(first.trim_end(), "New basis file");
        assert_eq!(first.len(), NUM_OPT_WIDTH);
    }

    #[test]
    fn test_set_int_overwrites_in_place() {
        let mut opts = SolverOptions::quad();
        let before: Vec<String> = opts.ints.iter().map(|(n, _)| n.clone()).collect();
        opts.set_int("Scale option", 0);
        let after: Vec<String> = opts.ints.iter().map(|(n, _)| n.clone()).collect();
        assert_eq!(before, after);
        assert_eq!(opts.int("Scale option"), Some(0));

        opts.set_real("Feasibility tol", 1e-15);
        assert_eq!(opts.real("Feasibility tol"), Some(1e-15));
    }
}
