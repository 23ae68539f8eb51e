pub mod d601_settlement;
