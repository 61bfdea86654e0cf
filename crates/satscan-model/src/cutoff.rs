//! Cutoff extraction: read the decision threshold straight from a stump's root split.

use crate::{ModelError, node::Node, tree::DecisionTree};

impl DecisionTree {
    /// Return the threshold of this tree's single split.
    ///
    /// Samples with a value below the cutoff are routed to the left child,
    /// all others to the right. The cutoff equals the smallest training value
    /// that was routed right.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ModelError::NoDecisionBoundary`] | The root is a leaf (constant or uninformative feature) |
    /// | [`ModelError::NotAStump`] | The tree has more than one internal split |
    pub fn cutoff(&self) -> Result<f64, ModelError> {
        match self.nodes.first() {
            Some(Node::Split { threshold, .. }) => {
                let n_splits = self.n_splits();
                if n_splits > 1 {
                    return Err(ModelError::NotAStump { n_splits });
                }
                Ok(*threshold)
            }
            _ => Err(ModelError::NoDecisionBoundary),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{ModelError, tree::DecisionTreeConfig};

    #[test]
    fn stump_cutoff_is_smallest_right_value() {
        let columns = vec![vec![0.5, 1.5, 2.5, 7.0, 8.0, 9.0]];
        let tree = DecisionTreeConfig::new()
            .with_max_depth(Some(1))
            .fit_columns(&columns, &[0, 0, 0, 1, 1, 1])
            .unwrap();
        assert_eq!(tree.cutoff().unwrap(), 7.0);
    }

    #[test]
    fn constant_feature_has_no_boundary() {
        let columns = vec![vec![3.0; 5]];
        let tree = DecisionTreeConfig::new()
            .with_max_depth(Some(1))
            .fit_columns(&columns, &[0, 1, 0, 1, 0])
            .unwrap();
        assert!(matches!(tree.cutoff(), Err(ModelError::NoDecisionBoundary)));
    }

    #[test]
    fn deeper_tree_is_not_a_stump() {
        let columns = vec![vec![1.0, 2.0, 3.0, 4.0]];
        let tree = DecisionTreeConfig::new()
            .with_max_depth(Some(2))
            .fit_columns(&columns, &[0, 1, 1, 0])
            .unwrap();
        assert!(tree.n_splits() > 1);
        assert!(matches!(
            tree.cutoff(),
            Err(ModelError::NotAStump { n_splits }) if n_splits == tree.n_splits()
        ));
    }
}
