mod node_lstm;
