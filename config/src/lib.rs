//! Configuration types shared between blithe crates.

mod args;
mod task;

pub use args::*;
pub use task::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_train_args_default() {
        let args = TrainArgs::default();
        assert_eq!(args.learning_rate, 5e-5);
        assert_eq!(args.num_train_epochs, 3);
        assert_eq!(args.batch_size, 1);
        assert_eq!(args.eval_ratio, 0.1);
        assert!(!args.fp16);
        assert!(args.report_to.is_empty());
    }

    #[test]
    fn test_eval_args_default() {
        let args = EvalArgs::default();
        assert_eq!(args.batch_size, 1);
        assert!(!args.load_preprocessed_data);
        assert!(args.load_preprocessed_data_path.is_none());
    }

    #[test]
    fn test_task_serde() {
        assert_eq!(
            serde_json::from_str::<Task>("\"causal-lm\"").unwrap(),
            Task::CausalLm
        );
        assert_eq!(
            serde_json::from_str::<Task>("\"sequence-classification\"").unwrap(),
            Task::SequenceClassification
        );
        assert_eq!(serde_json::to_string(&Task::Seq2Seq).unwrap(), "\"seq2seq\"");
    }

    #[test]
    fn test_task_from_str() {
        assert_eq!("causal-lm".parse::<Task>().unwrap(), Task::CausalLm);
        assert_eq!("generation".parse::<Task>().unwrap(), Task::CausalLm);
        assert_eq!("text-to-text".parse::<Task>().unwrap(), Task::Seq2Seq);
        assert_eq!("word-prediction".parse::<Task>().unwrap(), Task::MaskedLm);
        assert!("bogus".parse::<Task>().is_err());
    }

    #[test]
    fn test_train_args_serde_partial() {
        // Missing fields fall back to defaults, as saved configs from older
        // versions rely on.
        let args: TrainArgs = serde_json::from_str(r#"{"batch_size": 8}"#).unwrap();
        assert_eq!(args.batch_size, 8);
        assert_eq!(args.num_train_epochs, 3);
        assert_eq!(args.mlm_probability, 0.1);
    }

    #[test]
    fn test_generation_settings_default() {
        let settings = GenerationSettings::default();
        assert_eq!(settings.max_new_tokens, 50);
        assert!(!settings.do_sample);
        assert_eq!(settings.top_k, Some(50));
    }
}
